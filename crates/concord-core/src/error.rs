//! Error types for the audit engine
//!
//! Only dimension mismatches hard-fail an audit call. Quorum loss is not an
//! error at this layer: it surfaces as a `FRACTURED` result status, and
//! callers that need a pass/fail verdict convert it to [`FracturedConsensus`]
//! through the fail-closed accessors.

use thiserror::Error;

/// Hard failures raised by audit operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Vectors of different dimension reached the same edge. This is a
    /// programming error in the caller, not a data-quality condition.
    #[error("fiber mismatch: left vector has {left} components, right has {right}")]
    FiberMismatch { left: usize, right: usize },
}

impl AuditError {
    /// Create a fiber mismatch error from the two observed lengths.
    pub fn fiber_mismatch(left: usize, right: usize) -> Self {
        Self::FiberMismatch { left, right }
    }
}

/// The vault lost quorum while an audit depended on its basis.
///
/// No pass/fail verdict exists for the affected result; decisions must not
/// proceed until quorum is restored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("fractured consensus: perturbation basis unavailable below quorum, no verdict issued")]
pub struct FracturedConsensus;
