//! Corrective-action policy
//!
//! Turns a truth/reality divergence into an ordered list of sized actions.
//! Each dimension is judged independently against fixed policy constants; a
//! pair with nothing to fix yields a single explicit no-action entry so
//! downstream consumers never see an empty plan.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::SignalVector;

/// Friction level above which a timeline or budget action is recommended.
pub const FRICTION_ACTION_THRESHOLD: f64 = 0.1;

/// Hours represented by a fully saturated timeline friction.
pub const TIMELINE_SCALE_HOURS: f64 = 24.0;

/// Currency units represented by a fully saturated budget friction.
pub const CURRENCY_SCALE: f64 = 10_000.0;

/// One corrective action, sized from the divergence that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairAction {
    SupplementalShipment { units: f64 },
    ReturnOverstock { units: f64 },
    TimelineRecovery { hours: f64 },
    BudgetVariance { amount: f64 },
    NoActionRequired,
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SupplementalShipment { units } => {
                write!(f, "Dispatch supplemental shipment of {units} units")
            }
            Self::ReturnOverstock { units } => {
                write!(f, "Schedule return of {units} overstocked units")
            }
            Self::TimelineRecovery { hours } => {
                write!(f, "Expedite operations to recover {hours:.1} hours")
            }
            Self::BudgetVariance { amount } => {
                write!(f, "File budget variance of ${amount:.2}")
            }
            Self::NoActionRequired => write!(f, "Aligned. No corrective action required"),
        }
    }
}

/// Derive the ordered corrective actions for a truth/reality pair.
///
/// `truth` is the expected state (what was agreed), `reality` the observed
/// one. Quantity is judged on the gap between the two; timeline and budget on
/// reality's friction alone.
pub fn advise(truth: &SignalVector, reality: &SignalVector) -> Vec<RepairAction> {
    let mut actions = Vec::new();

    let gap = truth.alpha - reality.alpha;
    if gap > 0.0 {
        actions.push(RepairAction::SupplementalShipment { units: gap });
    } else if gap < 0.0 {
        actions.push(RepairAction::ReturnOverstock { units: -gap });
    }

    if reality.j_friction > FRICTION_ACTION_THRESHOLD {
        actions.push(RepairAction::TimelineRecovery {
            hours: reality.j_friction * TIMELINE_SCALE_HOURS,
        });
    }

    if reality.k_friction > FRICTION_ACTION_THRESHOLD {
        actions.push(RepairAction::BudgetVariance {
            amount: reality.k_friction * CURRENCY_SCALE,
        });
    }

    if actions.is_empty() {
        actions.push(RepairAction::NoActionRequired);
    }
    actions
}

/// [`advise`], rendered to recommendation strings.
pub fn advise_strings(truth: &SignalVector, reality: &SignalVector) -> Vec<String> {
    advise(truth, reality)
        .iter()
        .map(ToString::to_string)
        .collect()
}
