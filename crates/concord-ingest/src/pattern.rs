//! Deterministic pattern extraction
//!
//! The terminal fallback strategy: a fixed regex set over sanitized text.
//! Quantities are matched both as labeled tokens (`qty: 97`) and trailing
//! units (`97 units`); lateness must carry a late/delay marker so shift
//! schedules aren't misread; currency accepts `$1,234.56` and `1234 USD`;
//! damaged-unit counts cover field damage reports. Matched values are scaled
//! onto signal ranges here, so candidates leave this strategy already
//! normalized.

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use concord_core::{ExtractionMethod, CURRENCY_SCALE, TIMELINE_SCALE_HOURS};

use crate::extract::{Candidate, ExtractionStrategy, StrategyError};
use crate::schema::RawFields;

/// Damaged units represented by a fully saturated logistics friction.
pub const DAMAGE_SCALE_UNITS: f64 = 100.0;

/// Regex-driven field extraction.
pub struct PatternStrategy {
    quantity: Regex,
    late_hours: Regex,
    damaged: Regex,
    currency: Regex,
}

impl PatternStrategy {
    pub fn new() -> Self {
        Self {
            quantity: Regex::new(
                r"(?i)(?:qty|quantity|units|count)\s*[:=]?\s*(\d+)|(\d+)\s*(?:units|qty|quantity|pcs)",
            )
            .expect("quantity pattern compiles"),
            late_hours: Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:hours?|hrs?)\s*(?:late|delay(?:ed)?)")
                .expect("lateness pattern compiles"),
            damaged: Regex::new(r"(?i)(?:damaged|broken)\s*[:=]?\s*(\d+)|(\d+)\s*(?:damaged|broken)")
                .expect("damage pattern compiles"),
            currency: Regex::new(r"(?i)\$\s*([\d,]+(?:\.\d+)?)|([\d,]+(?:\.\d+)?)\s*(?:usd|dollars)")
                .expect("currency pattern compiles"),
        }
    }

    /// Scan sanitized text for candidate fields.
    ///
    /// Synchronous core of [`ExtractionStrategy::draw`]; returns
    /// [`Candidate::Waste`] when no pattern matches at all.
    pub fn scan(&self, text: &str) -> Candidate {
        let quantity = first_number(&self.quantity, text);
        let hours = first_number(&self.late_hours, text);
        let damaged = first_number(&self.damaged, text);
        let amount = first_number(&self.currency, text);

        if quantity.is_none() && hours.is_none() && damaged.is_none() && amount.is_none() {
            return Candidate::Waste;
        }

        debug!(?quantity, ?hours, ?damaged, ?amount, "pattern matches");
        Candidate::Fields(RawFields {
            alpha: Some(quantity.unwrap_or(0.0)),
            i_friction: damaged.map(|d| (d / DAMAGE_SCALE_UNITS).min(1.0)),
            j_friction: hours.map(|h| (h / TIMELINE_SCALE_HOURS).min(1.0)),
            k_friction: amount.map(|a| (a / CURRENCY_SCALE).min(1.0)),
        })
    }
}

impl Default for PatternStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Pattern
    }

    async fn draw(&self, text: &str) -> Result<Candidate, StrategyError> {
        Ok(self.scan(text))
    }
}

/// First participating capture group of the first match, parsed as a number
/// with thousands separators stripped.
fn first_number(regex: &Regex, text: &str) -> Option<f64> {
    let caps = regex.captures(text)?;
    let matched = caps.iter().skip(1).flatten().next()?;
    matched.as_str().replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> RawFields {
        match PatternStrategy::new().scan(text) {
            Candidate::Fields(fields) => fields,
            other => panic!("expected fields for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn labeled_quantity_is_matched() {
        assert_eq!(fields("qty: 97").alpha, Some(97.0));
        assert_eq!(fields("Quantity = 50").alpha, Some(50.0));
    }

    #[test]
    fn trailing_unit_quantity_is_matched() {
        assert_eq!(fields("received 97 units today").alpha, Some(97.0));
        assert_eq!(fields("12 pcs on the dock").alpha, Some(12.0));
    }

    #[test]
    fn lateness_requires_the_delay_marker() {
        let late = fields("truck arrived 4 hours late");
        assert_eq!(late.j_friction, Some(4.0 / 24.0));

        // A bare duration is not lateness.
        assert!(matches!(
            PatternStrategy::new().scan("an 8 hours shift"),
            Candidate::Waste
        ));
    }

    #[test]
    fn fractional_hours_scale_correctly() {
        let late = fields("1.5 hrs delayed at customs");
        assert_eq!(late.j_friction, Some(1.5 / 24.0));
    }

    #[test]
    fn lateness_saturates_at_one_day() {
        let late = fields("delivery was 60 hours late");
        assert_eq!(late.j_friction, Some(1.0));
    }

    #[test]
    fn currency_accepts_both_forms() {
        assert_eq!(fields("$ 2,500 over budget").k_friction, Some(0.25));
        assert_eq!(fields("overrun of 1250 USD").k_friction, Some(0.125));
    }

    #[test]
    fn damage_counts_scale_to_friction() {
        assert_eq!(fields("12 damaged on arrival").i_friction, Some(0.12));
        assert_eq!(fields("broken: 250").i_friction, Some(1.0));
    }

    #[test]
    fn mixed_report_fills_every_matched_field() {
        let f = fields("Received 97 units, 4 hours late, $250 short, 3 damaged");
        assert_eq!(f.alpha, Some(97.0));
        assert_eq!(f.j_friction, Some(4.0 / 24.0));
        assert_eq!(f.k_friction, Some(0.025));
        assert_eq!(f.i_friction, Some(0.03));
    }

    #[test]
    fn quantity_defaults_to_zero_when_only_friction_matches() {
        let f = fields("3 hours late");
        assert_eq!(f.alpha, Some(0.0));
    }

    #[test]
    fn no_numeric_tokens_is_waste() {
        assert!(matches!(
            PatternStrategy::new().scan("the shipment looked fine"),
            Candidate::Waste
        ));
        assert!(matches!(PatternStrategy::new().scan(""), Candidate::Waste));
    }
}
