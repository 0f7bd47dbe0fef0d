//! Aggregate integrity scoring
//!
//! Condenses a truth/reality pair into one bounded risk figure plus a
//! financial leakage estimate. Quantity risk is relative to the expected
//! quantity so a 3-unit shortfall on 100 units reads very differently from a
//! 3-unit shortfall on 5; the friction components are already normalized and
//! enter the risk vector as-is.

use serde::{Deserialize, Serialize};

use crate::repair::CURRENCY_SCALE;
use crate::signal::SignalVector;

/// Risk index below which a pair is considered in alignment.
pub const RISK_TOLERANCE: f64 = 0.02;

/// Estimated cost of one undelivered unit.
pub const UNIT_SHORTFALL_COST: f64 = 10.0;

/// Estimated cost of one full day of delay.
pub const DAY_DELAY_COST: f64 = 1_000.0;

/// Per-dimension contribution to the risk index, as percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub quantity_pct: f64,
    pub logistics_pct: f64,
    pub timeline_pct: f64,
    pub financial_pct: f64,
}

/// Condensed health figure for a truth/reality pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Euclidean norm of the risk vector, capped at 1.
    pub risk_index: f64,
    /// `(1 - risk_index) * 100`.
    pub integrity_pct: f64,
    /// True when `risk_index` is below [`RISK_TOLERANCE`].
    pub aligned: bool,
    /// Estimated currency leakage from shortfall, delay and variance.
    pub leakage_estimate: f64,
    pub breakdown: RiskBreakdown,
}

/// Score a truth/reality pair.
pub fn compute_integrity(expected: &SignalVector, actual: &SignalVector) -> IntegrityReport {
    // Relative quantity risk; floor the base at one unit so an expected
    // quantity of zero cannot divide away the risk.
    let quantity_risk = (expected.alpha - actual.alpha).abs() / expected.alpha.max(1.0);
    let risk = [
        quantity_risk,
        actual.i_friction,
        actual.j_friction,
        actual.k_friction,
    ];
    let risk_index = risk.iter().map(|r| r * r).sum::<f64>().sqrt().min(1.0);

    let shortfall = (expected.alpha - actual.alpha).max(0.0);
    let leakage_estimate = shortfall * UNIT_SHORTFALL_COST
        + actual.j_friction * DAY_DELAY_COST
        + actual.k_friction * CURRENCY_SCALE;

    IntegrityReport {
        risk_index,
        integrity_pct: (1.0 - risk_index) * 100.0,
        aligned: risk_index < RISK_TOLERANCE,
        leakage_estimate,
        breakdown: RiskBreakdown {
            quantity_pct: quantity_risk * 100.0,
            logistics_pct: actual.i_friction * 100.0,
            timeline_pct: actual.j_friction * 100.0,
            financial_pct: actual.k_friction * 100.0,
        },
    }
}
