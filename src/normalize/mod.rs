//! Declarative extraction of canonical fields from raw provider payloads.
//!
//! Adapters whose vendors return flat-ish JSON describe their shape with a
//! [`FieldMapping`] table instead of hand-written extraction: each canonical
//! field maps to a dot-path into the payload, a transform function, or a
//! literal constant. [`normalize_from_mapping`] walks the catalog in order
//! and populates only the mapped fields.

#[cfg(test)]
mod tests;

use serde_json::Value;

use crate::schema::{AddressRecord, Field};

/// How one canonical field is derived from a raw payload.
pub enum MappingRule {
    /// Dot-path navigation into nested objects, e.g. `"address.postcode"`.
    /// Missing intermediates or non-object values short-circuit to absent.
    Path(&'static str),
    /// Arbitrary extraction over the whole payload. Returning `Value::Null`
    /// leaves the field absent.
    Transform(fn(&Value) -> Value),
    /// Literal value stored verbatim.
    Constant(&'static str),
}

/// Per-provider mapping table: canonical field to extraction rule.
pub type FieldMapping = &'static [(Field, MappingRule)];

/// Applies a mapping table to a raw payload. Fields not present in the
/// table are absent from the output; population follows catalog order.
pub fn normalize_from_mapping(raw: &Value, mapping: FieldMapping) -> AddressRecord {
    let mut record = AddressRecord::new();
    for field in Field::ALL {
        let Some((_, rule)) = mapping.iter().find(|(f, _)| *f == field) else {
            continue;
        };
        match rule {
            MappingRule::Path(path) => {
                if let Some(value) = nested_value(raw, path) {
                    record.insert(field, value.clone());
                }
            }
            MappingRule::Transform(extract) => record.insert(field, extract(raw)),
            MappingRule::Constant(literal) => record.insert_str(field, *literal),
        }
    }
    record
}

/// Resolves a dot-path into nested JSON objects.
pub fn nested_value<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = data;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// String at a dot-path, empty when absent or not a string.
pub fn str_at<'a>(data: &'a Value, path: &str) -> &'a str {
    nested_value(data, path).and_then(Value::as_str).unwrap_or("")
}

/// Number at a dot-path, coercing numeric strings (vendors disagree on
/// whether coordinates are numbers or strings).
pub fn f64_at(data: &Value, path: &str) -> Option<f64> {
    match nested_value(data, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Joins the non-empty display components of a record into one line:
/// address lines, city, postal code, state and country code, comma-separated.
pub fn build_address_text(record: &AddressRecord) -> String {
    [
        Field::AddressLine1,
        Field::AddressLine2,
        Field::AddressLine3,
        Field::City,
        Field::PostalCode,
        Field::State,
        Field::CountryCode,
    ]
    .iter()
    .map(|field| record.text_of(*field))
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Parses a `"lat,lon"` proximity hint. Malformed input yields `None`.
pub fn parse_proximity(proximity: &str) -> Option<(f64, f64)> {
    let (lat, lon) = proximity.split_once(',')?;
    // A second comma means the input was not "lat,lon".
    if lon.contains(',') {
        return None;
    }
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    Some((lat, lon))
}

/// Stable cross-backend identifier: `"{backend_name}-{reference}"`.
/// Absent whenever the record carries no reference.
pub fn geoaddress_id(record: &AddressRecord) -> Option<String> {
    let reference = record.get_str(Field::Reference).filter(|r| !r.is_empty())?;
    let backend = record
        .get_str(Field::BackendName)
        .filter(|b| !b.is_empty())?;
    Some(format!("{backend}-{reference}"))
}
