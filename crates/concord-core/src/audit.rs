//! Pairwise and cycle consistency auditing
//!
//! The check is a plain weighted-graph comparison: every node holds a
//! fixed-dimension numeric vector, every edge asserts that its two ends
//! agree, and the per-edge obligation is settled by the component-wise
//! difference ("coboundary") and its Euclidean norm ("torsion"). Zero torsion
//! means agreement; the magnitude of a nonzero torsion is the size of the
//! disagreement in signal units.
//!
//! Two thresholds govern two different decisions and are deliberately kept
//! apart: [`EXACT_EPSILON`] settles whether an edge contributes an
//! obstruction at all, while the coarser [`HANDSHAKE_EPSILON`] settles the
//! business-facing pass/fail verdict for a pair of reports.
//!
//! An auditor may carry a [`BasisSource`]. While the source can produce a
//! basis, raw torsion is scaled by `1 + |i|` of that basis; when the source
//! reports quorum loss the auditor fails closed, tagging results `FRACTURED`
//! with a sentinel torsion and refusing to issue any verdict.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AuditError, FracturedConsensus};
use crate::signal::SignalVector;
use crate::topology::Topology;

/// Exact-consistency threshold used for obstruction arithmetic.
pub const EXACT_EPSILON: f64 = 1e-5;

/// Business alignment ("handshake") threshold used for pass/fail verdicts.
pub const HANDSHAKE_EPSILON: f64 = 0.01;

/// Sentinel torsion reported for results audited without a usable basis.
/// Finite rather than infinite so serialized reports remain valid JSON.
pub const FRACTURE_TORSION: f64 = 1.0e9;

/// Source of the rotating perturbation basis.
///
/// Implemented by the epoch vault. `None` means the source is below quorum
/// and the auditor must not issue verdicts until it recovers.
#[cfg_attr(test, mockall::automock)]
pub trait BasisSource: Send + Sync {
    fn current_basis(&self) -> Option<SignalVector>;
}

/// Verdict tag attached to every audited obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeStatus {
    #[serde(rename = "ALIGNED")]
    Aligned,
    #[serde(rename = "MISALIGNED")]
    Misaligned,
    #[serde(rename = "FRACTURED")]
    Fractured,
}

/// Component-wise difference along an edge plus its magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coboundary {
    pub delta: Vec<f64>,
    pub torsion: f64,
}

impl Coboundary {
    /// True when the two ends agree to within [`EXACT_EPSILON`].
    pub fn is_exact(&self) -> bool {
        self.torsion < EXACT_EPSILON
    }
}

/// Compute the difference vector and its Euclidean norm for two equal-length
/// vectors. Symmetric in magnitude: swapping the arguments negates `delta`
/// but leaves `torsion` unchanged.
pub fn coboundary(a: &[f64], b: &[f64]) -> Result<Coboundary, AuditError> {
    if a.len() != b.len() {
        return Err(AuditError::fiber_mismatch(a.len(), b.len()));
    }
    let delta: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
    let torsion = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
    Ok(Coboundary { delta, torsion })
}

/// Outcome of auditing a single consistency obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// Component-wise difference, left minus right. Empty when the audit ran
    /// without a usable basis and no figure could be certified.
    pub delta: Vec<f64>,
    pub torsion: f64,
    pub aligned: bool,
    pub status: EdgeStatus,
}

impl AuditResult {
    fn from_coboundary(cob: Coboundary, factor: f64) -> Self {
        let torsion = cob.torsion * factor;
        let aligned = torsion < HANDSHAKE_EPSILON;
        let status = if aligned {
            EdgeStatus::Aligned
        } else {
            EdgeStatus::Misaligned
        };
        Self {
            delta: cob.delta,
            torsion,
            aligned,
            status,
        }
    }

    fn fractured() -> Self {
        Self {
            delta: Vec::new(),
            torsion: FRACTURE_TORSION,
            aligned: false,
            status: EdgeStatus::Fractured,
        }
    }

    /// Fail-closed verdict accessor: the alignment decision, or
    /// [`FracturedConsensus`] if the audit ran below quorum.
    pub fn verdict(&self) -> Result<bool, FracturedConsensus> {
        match self.status {
            EdgeStatus::Fractured => Err(FracturedConsensus),
            _ => Ok(self.aligned),
        }
    }
}

/// Per-edge entry in a [`CycleReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeReport {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub result: AuditResult,
}

/// Aggregated outcome of walking a topology's edge list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub edges: Vec<EdgeReport>,
    /// Sum of per-edge torsion, or [`FRACTURE_TORSION`] when the walk ran
    /// below quorum and no sum could be certified.
    pub total_systemic_torsion: f64,
    /// True when any edge diverges beyond [`EXACT_EPSILON`].
    pub obstructed: bool,
    /// Edges ignored because they referenced a node absent from the topology.
    pub skipped_edges: usize,
}

impl CycleReport {
    /// Fail-closed verdict accessor: whether the whole cycle is consistent,
    /// or [`FracturedConsensus`] if any obligation was audited below quorum.
    pub fn is_consistent(&self) -> Result<bool, FracturedConsensus> {
        let fractured = self.total_systemic_torsion >= FRACTURE_TORSION
            || self
                .edges
                .iter()
                .any(|e| e.result.status == EdgeStatus::Fractured);
        if fractured {
            return Err(FracturedConsensus);
        }
        Ok(!self.obstructed)
    }

    pub fn aligned_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.result.status == EdgeStatus::Aligned)
            .count()
    }

    pub fn misaligned_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.result.status == EdgeStatus::Misaligned)
            .count()
    }
}

/// Basis lookup outcome, resolved once per audit call so a mid-walk epoch
/// shift cannot mix factors within one report.
#[derive(Clone, Copy)]
enum Perturbation {
    Factor(f64),
    Fractured,
}

/// Pairwise and cycle auditor, optionally perturbed by a vault basis.
///
/// Holds no mutable state; audits of independent edges are safe to run from
/// parallel tasks sharing one auditor.
#[derive(Clone, Default)]
pub struct Auditor {
    basis: Option<Arc<dyn BasisSource>>,
}

impl Auditor {
    /// Auditor without perturbation; torsion figures are raw.
    pub fn new() -> Self {
        Self { basis: None }
    }

    /// Auditor whose torsion figures are scaled by the source's current basis.
    pub fn with_basis_source(source: Arc<dyn BasisSource>) -> Self {
        Self {
            basis: Some(source),
        }
    }

    /// Audit one consistency obligation between two raw vectors.
    pub fn audit_pair(&self, a: &[f64], b: &[f64]) -> Result<AuditResult, AuditError> {
        let cob = coboundary(a, b)?;
        match self.perturbation() {
            Perturbation::Factor(factor) => {
                let result = AuditResult::from_coboundary(cob, factor);
                debug!(
                    torsion = result.torsion,
                    aligned = result.aligned,
                    "pair audited"
                );
                Ok(result)
            }
            Perturbation::Fractured => {
                warn!("basis unavailable below quorum, refusing verdict");
                Ok(AuditResult::fractured())
            }
        }
    }

    /// Walk the topology's ordered edge list and aggregate per-edge results.
    ///
    /// Edges naming an unknown node are skipped and counted, not fatal; a
    /// dimension mismatch between two known nodes still hard-fails the call.
    pub fn audit_cycle(&self, topology: &Topology) -> Result<CycleReport, AuditError> {
        let perturbation = self.perturbation();
        if matches!(perturbation, Perturbation::Fractured) {
            warn!("basis unavailable below quorum, cycle report fails closed");
        }

        let mut edges = Vec::with_capacity(topology.edge_count());
        let mut total = 0.0;
        let mut obstructed = false;
        let mut skipped = 0;

        for edge in topology.edges() {
            let (a, b) = match (topology.node(&edge.from), topology.node(&edge.to)) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    warn!(from = %edge.from, to = %edge.to, "edge references unknown node, skipping");
                    skipped += 1;
                    continue;
                }
            };

            let result = match perturbation {
                Perturbation::Factor(factor) => {
                    let result = AuditResult::from_coboundary(coboundary(a, b)?, factor);
                    total += result.torsion;
                    if result.torsion >= EXACT_EPSILON {
                        obstructed = true;
                    }
                    result
                }
                Perturbation::Fractured => AuditResult::fractured(),
            };

            debug!(from = %edge.from, to = %edge.to, torsion = result.torsion, "edge audited");
            edges.push(EdgeReport {
                from: edge.from.clone(),
                to: edge.to.clone(),
                result,
            });
        }

        if matches!(perturbation, Perturbation::Fractured) {
            total = FRACTURE_TORSION;
            obstructed = true;
        }

        Ok(CycleReport {
            edges,
            total_systemic_torsion: total,
            obstructed,
            skipped_edges: skipped,
        })
    }

    fn perturbation(&self) -> Perturbation {
        match &self.basis {
            None => Perturbation::Factor(1.0),
            Some(source) => match source.current_basis() {
                Some(basis) => Perturbation::Factor(1.0 + basis.i_friction.abs()),
                None => Perturbation::Fractured,
            },
        }
    }
}

impl fmt::Debug for Auditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auditor")
            .field("perturbed", &self.basis.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(vectors: &[(&str, [f64; 4])]) -> Topology {
        let mut topology = Topology::new();
        let names: Vec<&str> = vectors.iter().map(|(n, _)| *n).collect();
        for (name, v) in vectors {
            topology.insert_node(*name, v.to_vec());
        }
        topology.link_cycle(&names);
        topology
    }

    #[test]
    fn coboundary_computes_difference_and_norm() {
        let cob = coboundary(&[3.0, 0.0, 4.0], &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(cob.delta, vec![3.0, 0.0, 4.0]);
        assert!((cob.torsion - 5.0).abs() < 1e-12);
    }

    #[test]
    fn coboundary_of_identical_vectors_is_exact() {
        let v = [7.0, 0.5, 0.25, 0.125];
        let cob = coboundary(&v, &v).unwrap();
        assert_eq!(cob.torsion, 0.0);
        assert!(cob.is_exact());
    }

    #[test]
    fn mismatched_dimensions_hard_fail() {
        let err = coboundary(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, AuditError::FiberMismatch { left: 2, right: 1 });
    }

    #[test]
    fn handshake_threshold_separates_verdicts() {
        let auditor = Auditor::new();
        let fine = auditor
            .audit_pair(&[0.0, 0.0, 0.0, 0.009], &[0.0; 4])
            .unwrap();
        assert!(fine.aligned);
        assert_eq!(fine.status, EdgeStatus::Aligned);

        let coarse = auditor
            .audit_pair(&[0.0, 0.0, 0.0, 0.02], &[0.0; 4])
            .unwrap();
        assert!(!coarse.aligned);
        assert_eq!(coarse.status, EdgeStatus::Misaligned);
    }

    #[test]
    fn basis_scales_torsion() {
        let mut source = MockBasisSource::new();
        source
            .expect_current_basis()
            .return_const(Some(SignalVector::new(1.0, 0.5, 0.0, 0.0)));

        let auditor = Auditor::with_basis_source(Arc::new(source));
        let result = auditor.audit_pair(&[2.0, 0.0, 0.0, 0.0], &[0.0; 4]).unwrap();
        assert!((result.torsion - 3.0).abs() < 1e-12);
    }

    #[test]
    fn quorum_loss_fails_closed() {
        let mut source = MockBasisSource::new();
        source.expect_current_basis().return_const(None);

        let auditor = Auditor::with_basis_source(Arc::new(source));
        let result = auditor.audit_pair(&[1.0, 0.0, 0.0, 0.0], &[0.0; 4]).unwrap();
        assert_eq!(result.status, EdgeStatus::Fractured);
        assert_eq!(result.torsion, FRACTURE_TORSION);
        assert!(result.verdict().is_err());
    }

    #[test]
    fn zero_difference_cycle_is_unobstructed() {
        let v = [12.0, 0.0, 0.1, 0.0];
        let topology = ring(&[("a", v), ("b", v), ("c", v)]);
        let report = Auditor::new().audit_cycle(&topology).unwrap();

        assert_eq!(report.total_systemic_torsion, 0.0);
        assert!(!report.obstructed);
        assert_eq!(report.aligned_count(), 3);
        assert_eq!(report.is_consistent(), Ok(true));
    }

    #[test]
    fn divergent_edge_obstructs_cycle() {
        let topology = ring(&[
            ("a", [10.0, 0.0, 0.0, 0.0]),
            ("b", [10.0, 0.0, 0.0, 0.0]),
            ("c", [9.0, 0.0, 0.0, 0.0]),
        ]);
        let report = Auditor::new().audit_cycle(&topology).unwrap();

        assert!(report.obstructed);
        assert_eq!(report.misaligned_count(), 2);
        assert!((report.total_systemic_torsion - 2.0).abs() < 1e-12);
        assert_eq!(report.is_consistent(), Ok(false));
    }

    #[test]
    fn unknown_node_edges_are_skipped_and_counted() {
        let mut topology = Topology::new().with_node("a", vec![1.0, 0.0, 0.0, 0.0]);
        topology.push_edge(crate::topology::Edge::new("a", "phantom"));
        let report = Auditor::new().audit_cycle(&topology).unwrap();

        assert_eq!(report.skipped_edges, 1);
        assert!(report.edges.is_empty());
        assert!(!report.obstructed);
    }

    #[test]
    fn fractured_cycle_refuses_verdict() {
        let mut source = MockBasisSource::new();
        source.expect_current_basis().return_const(None);

        let v = [5.0, 0.0, 0.0, 0.0];
        let topology = ring(&[("a", v), ("b", v)]);
        let report = Auditor::with_basis_source(Arc::new(source))
            .audit_cycle(&topology)
            .unwrap();

        assert_eq!(report.total_systemic_torsion, FRACTURE_TORSION);
        assert!(report.obstructed);
        assert!(report
            .edges
            .iter()
            .all(|e| e.result.status == EdgeStatus::Fractured));
        assert!(report.is_consistent().is_err());
    }

    #[test]
    fn status_tags_serialize_screaming() {
        let json = serde_json::to_string(&EdgeStatus::Misaligned).unwrap();
        assert_eq!(json, "\"MISALIGNED\"");
    }
}
