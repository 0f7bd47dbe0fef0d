//! Schema enforcement
//!
//! The single normalizer between candidate fields and a vector safe for
//! auditing. Historic extractor variants disagreed on field names, so
//! structured responses go through an explicit synonym table first; after
//! that the rules are the same for every strategy: `alpha` is required and
//! non-negative, frictions are finite and non-negative, and oversize
//! timeline/budget values are read as raw hours or currency and normalized
//! onto `[0, 1]`.
//!
//! A violation here never escapes the ingest boundary as an error; the
//! extractor converts it into a rejected record.

use serde_json::Value;
use thiserror::Error;

use concord_core::{SignalVector, CURRENCY_SCALE, TIMELINE_SCALE_HOURS};

/// Canonical field names and their accepted synonyms, in resolution order.
const FIELD_SYNONYMS: [(&str, &[&str]); 4] = [
    ("alpha", &["alpha", "quantity", "qty", "units", "count"]),
    ("i_friction", &["i_friction", "logistics", "damage"]),
    ("j_friction", &["j_friction", "time", "delay"]),
    ("k_friction", &["k_friction", "money", "cost"]),
];

/// A record that cannot be coerced into a valid signal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Candidate fields as a strategy reported them, before range enforcement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawFields {
    pub alpha: Option<f64>,
    pub i_friction: Option<f64>,
    pub j_friction: Option<f64>,
    pub k_friction: Option<f64>,
}

/// Resolve synonyms and coerce a structured response into [`RawFields`].
///
/// Canonical names win over synonyms; within the synonym list the first
/// present key is taken.
pub fn resolve_fields(value: &Value) -> Result<RawFields, SchemaViolation> {
    let mut fields = RawFields::default();
    for (canonical, synonyms) in FIELD_SYNONYMS {
        let slot = match canonical {
            "alpha" => &mut fields.alpha,
            "i_friction" => &mut fields.i_friction,
            "j_friction" => &mut fields.j_friction,
            _ => &mut fields.k_friction,
        };
        for synonym in synonyms {
            if let Some(raw) = value.get(synonym) {
                *slot = Some(coerce(canonical, raw)?);
                break;
            }
        }
    }
    Ok(fields)
}

/// Validate a structured response end to end.
pub fn validate_value(value: &Value) -> Result<SignalVector, SchemaViolation> {
    validate_fields(resolve_fields(value)?)
}

/// Enforce ranges and unit heuristics on candidate fields.
pub fn validate_fields(fields: RawFields) -> Result<SignalVector, SchemaViolation> {
    let alpha = fields.alpha.ok_or(SchemaViolation::MissingField("alpha"))?;
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(SchemaViolation::OutOfRange {
            field: "alpha",
            value: alpha,
        });
    }

    let i = fields.i_friction.unwrap_or(0.0);
    if !i.is_finite() || !(0.0..=1.0).contains(&i) {
        return Err(SchemaViolation::OutOfRange {
            field: "i_friction",
            value: i,
        });
    }

    let j = normalize_friction("j_friction", fields.j_friction.unwrap_or(0.0), TIMELINE_SCALE_HOURS)?;
    let k = normalize_friction("k_friction", fields.k_friction.unwrap_or(0.0), CURRENCY_SCALE)?;

    Ok(SignalVector::new(alpha, i, j, k))
}

/// Values above 1 are raw units (hours or currency) from an extractor that
/// skipped normalization; scale them down and cap at 1.
fn normalize_friction(
    field: &'static str,
    value: f64,
    oversize_scale: f64,
) -> Result<f64, SchemaViolation> {
    if !value.is_finite() || value < 0.0 {
        return Err(SchemaViolation::OutOfRange { field, value });
    }
    if value > 1.0 {
        Ok((value / oversize_scale).min(1.0))
    } else {
        Ok(value)
    }
}

fn coerce(field: &'static str, raw: &Value) -> Result<f64, SchemaViolation> {
    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(SchemaViolation::NotNumeric {
            field,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_names_validate_directly() {
        let vector = validate_value(&json!({
            "alpha": 97,
            "j_friction": 0.167
        }))
        .unwrap();
        assert_eq!(vector, SignalVector::new(97.0, 0.0, 0.167, 0.0));
    }

    #[test]
    fn synonyms_resolve_to_canonical_fields() {
        let vector = validate_value(&json!({
            "quantity": 50,
            "delay": 0.25,
            "cost": 0.1
        }))
        .unwrap();
        assert_eq!(vector, SignalVector::new(50.0, 0.0, 0.25, 0.1));
    }

    #[test]
    fn canonical_name_wins_over_synonym() {
        let fields = resolve_fields(&json!({"alpha": 5, "quantity": 9})).unwrap();
        assert_eq!(fields.alpha, Some(5.0));
    }

    #[test]
    fn numeric_strings_coerce() {
        let vector = validate_value(&json!({"alpha": "97", "time": "0.5"})).unwrap();
        assert_eq!(vector.alpha, 97.0);
        assert_eq!(vector.j_friction, 0.5);
    }

    #[test]
    fn missing_quantity_is_a_violation() {
        let err = validate_value(&json!({"j_friction": 0.5})).unwrap_err();
        assert_eq!(err, SchemaViolation::MissingField("alpha"));
    }

    #[test]
    fn non_numeric_field_is_a_violation() {
        let err = validate_value(&json!({"alpha": true})).unwrap_err();
        assert!(matches!(err, SchemaViolation::NotNumeric { field: "alpha", .. }));
    }

    #[test]
    fn negative_quantity_is_out_of_range() {
        let err = validate_value(&json!({"alpha": -3})).unwrap_err();
        assert!(matches!(err, SchemaViolation::OutOfRange { field: "alpha", .. }));
    }

    #[test]
    fn oversize_damage_is_rejected_not_rescaled() {
        let err = validate_value(&json!({"alpha": 1, "i_friction": 1.5})).unwrap_err();
        assert!(matches!(
            err,
            SchemaViolation::OutOfRange { field: "i_friction", .. }
        ));
    }

    #[test]
    fn oversize_lateness_reads_as_hours() {
        let vector = validate_value(&json!({"alpha": 1, "j_friction": 12})).unwrap();
        assert_eq!(vector.j_friction, 0.5);

        let capped = validate_value(&json!({"alpha": 1, "j_friction": 90})).unwrap();
        assert_eq!(capped.j_friction, 1.0);
    }

    #[test]
    fn oversize_variance_reads_as_currency() {
        let vector = validate_value(&json!({"alpha": 1, "k_friction": 2500})).unwrap();
        assert_eq!(vector.k_friction, 0.25);
    }

    #[test]
    fn friction_of_exactly_one_passes_through() {
        let vector = validate_value(&json!({"alpha": 1, "j_friction": 1.0})).unwrap();
        assert_eq!(vector.j_friction, 1.0);
    }

    #[test]
    fn nan_friction_is_out_of_range() {
        let err = validate_fields(RawFields {
            alpha: Some(1.0),
            j_friction: Some(f64::NAN),
            ..RawFields::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaViolation::OutOfRange { field: "j_friction", .. }
        ));
    }
}
