//! # Concord Core
//!
//! Consistency-audit engine for multi-party logistics reports:
//! - Validated observation records ([`Signal`]) and their artifact forms
//! - Comparison topology of named nodes and ordered obligations
//! - Pairwise/cycle torsion auditing with optional vault perturbation
//! - Corrective-action policy and aggregate integrity scoring
//!
//! The engine is synchronous and side-effect free; ingestion, the epoch
//! vault and action delivery live in their own crates and meet this one at
//! the [`Signal`] and [`BasisSource`] seams.

pub mod audit;
pub mod error;
pub mod integrity;
pub mod repair;
pub mod signal;
pub mod topology;

pub use audit::{
    coboundary, AuditResult, Auditor, BasisSource, Coboundary, CycleReport, EdgeReport,
    EdgeStatus, EXACT_EPSILON, FRACTURE_TORSION, HANDSHAKE_EPSILON,
};
pub use error::{AuditError, FracturedConsensus};
pub use integrity::{compute_integrity, IntegrityReport, RiskBreakdown, RISK_TOLERANCE};
pub use repair::{
    advise, advise_strings, RepairAction, CURRENCY_SCALE, FRICTION_ACTION_THRESHOLD,
    TIMELINE_SCALE_HOURS,
};
pub use signal::{ExtractionMethod, Signal, SignalMeta, SignalVector, Waste, WasteStatus};
pub use topology::{Edge, Topology};
