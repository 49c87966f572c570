//! Canonical address schema.
//!
//! [`Field`] is the ordered catalog of canonical address fields every
//! provider normalizes into. [`AddressRecord`] is the normalized result
//! handed to callers: an ordered field map whose keys always serialize in
//! catalog order regardless of insertion order.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Canonical address fields, in output order.
///
/// The variant declaration order is the schema order: `Ord` on this enum is
/// the single ordering authority for record serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Text,
    Reference,
    AddressLine1,
    AddressLine2,
    AddressLine3,
    City,
    PostalCode,
    State,
    Region,
    Country,
    CountryCode,
    Municipality,
    Neighbourhood,
    AddressType,
    Latitude,
    Longitude,
    OsmId,
    OsmType,
    Confidence,
    Relevance,
    Backend,
    BackendName,
    GeoaddressId,
}

impl Field {
    /// All canonical fields in catalog order.
    pub const ALL: [Field; 23] = [
        Field::Text,
        Field::Reference,
        Field::AddressLine1,
        Field::AddressLine2,
        Field::AddressLine3,
        Field::City,
        Field::PostalCode,
        Field::State,
        Field::Region,
        Field::Country,
        Field::CountryCode,
        Field::Municipality,
        Field::Neighbourhood,
        Field::AddressType,
        Field::Latitude,
        Field::Longitude,
        Field::OsmId,
        Field::OsmType,
        Field::Confidence,
        Field::Relevance,
        Field::Backend,
        Field::BackendName,
        Field::GeoaddressId,
    ];

    /// The wire/key name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Text => "text",
            Field::Reference => "reference",
            Field::AddressLine1 => "address_line1",
            Field::AddressLine2 => "address_line2",
            Field::AddressLine3 => "address_line3",
            Field::City => "city",
            Field::PostalCode => "postal_code",
            Field::State => "state",
            Field::Region => "region",
            Field::Country => "country",
            Field::CountryCode => "country_code",
            Field::Municipality => "municipality",
            Field::Neighbourhood => "neighbourhood",
            Field::AddressType => "address_type",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::OsmId => "osm_id",
            Field::OsmType => "osm_type",
            Field::Confidence => "confidence",
            Field::Relevance => "relevance",
            Field::Backend => "backend",
            Field::BackendName => "backend_name",
            Field::GeoaddressId => "geoaddress_id",
        }
    }

    /// Human-readable description, used for documentation output.
    pub fn description(&self) -> &'static str {
        match self {
            Field::Text => "Full display text of the address",
            Field::Reference => "Provider-specific stable identifier",
            Field::AddressLine1 => "Street line (house number and street)",
            Field::AddressLine2 => "Additional address line",
            Field::AddressLine3 => "Additional address line",
            Field::City => "City, town or village",
            Field::PostalCode => "Postal or ZIP code",
            Field::State => "State or province",
            Field::Region => "Region or county",
            Field::Country => "Country name",
            Field::CountryCode => "ISO country code, uppercased",
            Field::Municipality => "Municipality",
            Field::Neighbourhood => "Neighbourhood, suburb or district",
            Field::AddressType => "Kind of place the result describes",
            Field::Latitude => "WGS84 latitude",
            Field::Longitude => "WGS84 longitude",
            Field::OsmId => "OpenStreetMap element id",
            Field::OsmType => "OpenStreetMap element type (N/W/R)",
            Field::Confidence => "Provider certainty in the match, 0-1",
            Field::Relevance => "Match quality against the query, 0-100",
            Field::Backend => "Display name of the answering backend",
            Field::BackendName => "Machine name of the answering backend",
            Field::GeoaddressId => "Stable cross-backend id (backend-reference)",
        }
    }

    /// Looks a field up by its wire name.
    pub fn from_str_opt(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A normalized address result.
///
/// Fields absent from a result are omitted entirely, never null-padded.
/// Because the backing map is keyed by [`Field`], iteration and
/// serialization always follow catalog order no matter in which order an
/// adapter populated the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressRecord {
    fields: BTreeMap<Field, Value>,
}

impl AddressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `field`. Null values are dropped, keeping the
    /// omitted-not-null-padded invariant.
    pub fn insert(&mut self, field: Field, value: Value) {
        if value.is_null() {
            return;
        }
        self.fields.insert(field, value);
    }

    pub fn insert_str(&mut self, field: Field, value: impl Into<String>) {
        self.fields.insert(field, Value::String(value.into()));
    }

    pub fn insert_f64(&mut self, field: Field, value: f64) {
        if let Some(number) = serde_json::Number::from_f64(value) {
            self.fields.insert(field, Value::Number(number));
        }
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn get_str(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).and_then(Value::as_str)
    }

    /// String content of `field`, empty when absent or not a string.
    pub fn text_of(&self, field: Field) -> &str {
        self.get_str(field).unwrap_or("")
    }

    /// Numeric content of `field`. Vendors disagree on whether coordinates
    /// arrive as numbers or strings, so numeric strings are coerced too.
    pub fn get_f64(&self, field: Field) -> Option<f64> {
        match self.fields.get(&field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.get_f64(Field::Latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.get_f64(Field::Longitude)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &Value)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    /// Converts the record into a JSON object with catalog-ordered keys.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (field, value) in &self.fields {
            map.insert(field.as_str().to_string(), value.clone());
        }
        Value::Object(map)
    }
}

impl Serialize for AddressRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

impl FromIterator<(Field, Value)> for AddressRecord {
    fn from_iter<T: IntoIterator<Item = (Field, Value)>>(iter: T) -> Self {
        let mut record = AddressRecord::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}
