//! Confidence estimation from vendor importance signals.

use serde_json::Value;

use crate::normalize::nested_value;
use crate::schema::{AddressRecord, Field};

/// Most vendor importance signals live in roughly 0-0.5; doubling maps them
/// onto a usable 0-1 range before capping.
pub const DEFAULT_IMPORTANCE_MULTIPLIER: f64 = 2.0;

/// A derived confidence below this is treated as an unreliable signal and
/// discarded in favor of the structural heuristic.
const MIN_TRUSTED_CONFIDENCE: f64 = 0.3;

/// Rounds to two decimals, the precision of every returned score.
pub fn round2(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Estimates confidence in `[0, 1]` for a normalized record.
///
/// Resolves `importance_key` as a dot-path into the raw feature, falling
/// back to the feature's `importance` then `properties.importance`. A
/// numeric signal yields `min(importance * multiplier, 1.0)`, accepted only
/// when at least 0.3; anything else falls through to
/// [`confidence_heuristic`]. The result is rounded to two decimals.
pub fn confidence(
    record: &AddressRecord,
    feature: Option<&Value>,
    importance_key: Option<&str>,
    multiplier: f64,
) -> f64 {
    if let Some(importance) = importance_signal(feature, importance_key)
        && let Some(derived) = from_importance(importance, multiplier)
    {
        return derived;
    }
    round2(confidence_heuristic(record))
}

/// Structural fallback: what the normalized record itself tells us about
/// match precision.
pub fn confidence_heuristic(record: &AddressRecord) -> f64 {
    let line1 = record.text_of(Field::AddressLine1);
    if !line1.is_empty() {
        // A street number usually means a rooftop-level match.
        if line1.chars().any(|c| c.is_ascii_digit()) {
            return 0.9;
        }
        return 0.7;
    }
    if !record.text_of(Field::City).is_empty() || !record.text_of(Field::PostalCode).is_empty() {
        return 0.5;
    }
    0.3
}

fn importance_signal(feature: Option<&Value>, importance_key: Option<&str>) -> Option<f64> {
    let feature = feature?;
    if let Some(key) = importance_key
        && let Some(value) = nested_value(feature, key)
    {
        return as_number(value);
    }
    nested_value(feature, "importance")
        .or_else(|| nested_value(feature, "properties.importance"))
        .and_then(as_number)
}

// Mirrors a lenient float cast: numbers and numeric strings qualify,
// nested mappings and everything else read as "signal absent".
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn from_importance(importance: f64, multiplier: f64) -> Option<f64> {
    if !importance.is_finite() {
        return None;
    }
    let derived = (importance * multiplier).min(1.0);
    if derived >= MIN_TRUSTED_CONFIDENCE {
        Some(round2(derived.max(0.0)))
    } else {
        None
    }
}
