//! Validated observation records
//!
//! A [`Signal`] is one party's free-text report reduced to a bounded numeric
//! vector: a non-negative quantity (`alpha`) and three friction components in
//! `[0, 1]` covering physical damage, timeline slip and financial variance.
//! Signals are produced only by the ingest pipeline's normalizer and are never
//! mutated afterwards; everything downstream (auditing, repair planning,
//! integrity scoring) consumes them read-only.
//!
//! Input that yields no usable numeric content at all becomes [`Waste`], a
//! tagged artifact that is excluded from the audit graph rather than entering
//! it as a misleading zero vector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a record's fields were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Primary text-understanding service.
    Service,
    /// Deterministic pattern fallback.
    Pattern,
    /// Constructed directly in code (fixtures, replays).
    Manual,
}

/// Provenance carried alongside the numeric fields.
///
/// Serialized under the `_meta` key of the artifact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMeta {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub extraction_method: ExtractionMethod,
}

impl SignalMeta {
    /// Stamp provenance for a record extracted right now.
    pub fn now(source: impl Into<String>, extraction_method: ExtractionMethod) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            extraction_method,
        }
    }
}

/// A validated observation record.
///
/// Field ranges are guaranteed by the ingest normalizer: `alpha >= 0` and each
/// friction component in `[0, 1]`. The auditor relies on this and performs no
/// re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub alpha: f64,
    pub i_friction: f64,
    pub j_friction: f64,
    pub k_friction: f64,
    #[serde(rename = "_meta")]
    pub meta: SignalMeta,
}

impl Signal {
    pub fn new(alpha: f64, i: f64, j: f64, k: f64, meta: SignalMeta) -> Self {
        Self {
            alpha,
            i_friction: i,
            j_friction: j,
            k_friction: k,
            meta,
        }
    }

    /// Assemble a signal from validated numeric fields and provenance.
    pub fn from_vector(vector: SignalVector, meta: SignalMeta) -> Self {
        Self::new(
            vector.alpha,
            vector.i_friction,
            vector.j_friction,
            vector.k_friction,
            meta,
        )
    }

    /// The numeric fields detached from provenance.
    pub fn vector(&self) -> SignalVector {
        SignalVector {
            alpha: self.alpha,
            i_friction: self.i_friction,
            j_friction: self.j_friction,
            k_friction: self.k_friction,
        }
    }
}

/// Plain 4-component view of a signal's numeric fields.
///
/// Used wherever provenance is irrelevant: audit arithmetic, repair policy,
/// the vault's perturbation basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalVector {
    pub alpha: f64,
    pub i_friction: f64,
    pub j_friction: f64,
    pub k_friction: f64,
}

impl SignalVector {
    /// Fixed dimension of every signal vector.
    pub const DIM: usize = 4;

    pub fn new(alpha: f64, i: f64, j: f64, k: f64) -> Self {
        Self {
            alpha,
            i_friction: i,
            j_friction: j,
            k_friction: k,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.alpha, self.i_friction, self.j_friction, self.k_friction]
    }

    /// True when every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.as_array().iter().all(|c| *c == 0.0)
    }
}

impl From<[f64; 4]> for SignalVector {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<SignalVector> for [f64; 4] {
    fn from(v: SignalVector) -> Self {
        v.as_array()
    }
}

/// Status tag carried by rejected input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WasteStatus {
    #[serde(rename = "TOPOLOGICAL_WASTE")]
    TopologicalWaste,
}

/// Artifact for input with no discernible numeric content.
///
/// Serializes to `{"status": "TOPOLOGICAL_WASTE", "_meta": {...}}` so excluded
/// records remain attributable in downstream artifact streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waste {
    pub status: WasteStatus,
    #[serde(rename = "_meta")]
    pub meta: SignalMeta,
}

impl Waste {
    pub fn new(meta: SignalMeta) -> Self {
        Self {
            status: WasteStatus::TopologicalWaste,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SignalMeta {
        SignalMeta::now("warehouse-7", ExtractionMethod::Manual)
    }

    #[test]
    fn signal_serializes_to_artifact_record_shape() {
        let signal = Signal::new(100.0, 0.0, 0.5, 0.25, meta());
        let value = serde_json::to_value(&signal).unwrap();

        assert_eq!(value["alpha"], 100.0);
        assert_eq!(value["j_friction"], 0.5);
        assert_eq!(value["_meta"]["source"], "warehouse-7");
        assert_eq!(value["_meta"]["extraction_method"], "manual");
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn waste_carries_status_tag() {
        let value = serde_json::to_value(Waste::new(meta())).unwrap();
        assert_eq!(value["status"], "TOPOLOGICAL_WASTE");
        assert_eq!(value["_meta"]["source"], "warehouse-7");
    }

    #[test]
    fn signal_round_trips_through_json() {
        let signal = Signal::new(42.0, 0.1, 0.2, 0.3, meta());
        let json = serde_json::to_string(&signal).unwrap();
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signal);
    }

    #[test]
    fn zero_vector_detection() {
        assert!(SignalVector::zero().is_zero());
        assert!(!SignalVector::new(0.0, 0.0, 0.001, 0.0).is_zero());
    }

    #[test]
    fn vector_array_round_trip() {
        let v = SignalVector::new(9.0, 0.1, 0.2, 0.3);
        assert_eq!(SignalVector::from(v.as_array()), v);
    }

    #[test]
    fn from_vector_keeps_every_field() {
        let v = SignalVector::new(9.0, 0.1, 0.2, 0.3);
        let signal = Signal::from_vector(v, meta());
        assert_eq!(signal.vector(), v);
    }
}
