//! The ten vendor adapters.
//!
//! Nominatim, LocationIQ and Maps.co speak the same OSM response dialect
//! and share the declarative [`OSM_ADDRESS_MAPPING`] table below. The
//! GeoJSON vendors (Photon, Geocode Earth, Geoapify, Mapbox) and the
//! bespoke ones (OpenCage, Google, Here) extract by hand, each in its own
//! module.

pub mod geoapify;
pub mod geocode_earth;
pub mod google;
pub mod here;
pub mod locationiq;
pub mod mapbox;
pub mod maps_co;
pub mod nominatim;
pub mod opencage;
pub mod photon;

pub use geoapify::Geoapify;
pub use geocode_earth::GeocodeEarth;
pub use google::Google;
pub use here::Here;
pub use locationiq::LocationIq;
pub use mapbox::Mapbox;
pub use maps_co::MapsCo;
pub use nominatim::Nominatim;
pub use opencage::OpenCage;
pub use photon::Photon;

use serde_json::Value;

use crate::normalize::{MappingRule, f64_at, nested_value, str_at};
use crate::schema::Field;

/// Field mapping for the Nominatim response dialect, also returned by
/// LocationIQ and Maps.co.
pub(crate) static OSM_ADDRESS_MAPPING: &[(Field, MappingRule)] = &[
    (Field::Reference, MappingRule::Transform(place_id_reference)),
    (Field::AddressLine1, MappingRule::Transform(house_and_road)),
    (Field::AddressLine2, MappingRule::Constant("")),
    (Field::AddressLine3, MappingRule::Constant("")),
    (Field::City, MappingRule::Transform(city_town_or_village)),
    (Field::PostalCode, MappingRule::Path("address.postcode")),
    (Field::State, MappingRule::Transform(state_or_province)),
    (Field::Region, MappingRule::Path("address.region")),
    (Field::Country, MappingRule::Path("address.country")),
    (Field::CountryCode, MappingRule::Transform(country_code_upper)),
    (Field::Municipality, MappingRule::Path("address.municipality")),
    (Field::Neighbourhood, MappingRule::Transform(neighbourhood_like)),
    (Field::AddressType, MappingRule::Transform(class_and_type)),
    (Field::Latitude, MappingRule::Transform(lat_as_number)),
    (Field::Longitude, MappingRule::Transform(lon_as_number)),
    (Field::OsmId, MappingRule::Transform(osm_id_as_integer)),
    (Field::OsmType, MappingRule::Transform(osm_type_upper)),
];

fn place_id_reference(raw: &Value) -> Value {
    match nested_value(raw, "place_id") {
        Some(Value::Number(n)) => Value::String(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Value::String(s.clone()),
        _ => Value::Null,
    }
}

fn house_and_road(raw: &Value) -> Value {
    let house_number = str_at(raw, "address.house_number");
    let road = str_at(raw, "address.road");
    if !house_number.is_empty() && !road.is_empty() {
        Value::String(format!("{house_number} {road}"))
    } else {
        Value::String(road.to_string())
    }
}

fn city_town_or_village(raw: &Value) -> Value {
    first_non_empty(raw, &["address.city", "address.town", "address.village"])
}

fn state_or_province(raw: &Value) -> Value {
    first_non_empty(raw, &["address.state", "address.province"])
}

fn country_code_upper(raw: &Value) -> Value {
    Value::String(str_at(raw, "address.country_code").to_uppercase())
}

fn neighbourhood_like(raw: &Value) -> Value {
    first_non_empty(
        raw,
        &["address.quarter", "address.neighbourhood", "address.suburb"],
    )
}

// Nominatim tags every result with a class/type pair; flatten it into one
// label. "place" and "highway" classes carry no information beyond their
// type, the rest keep both halves.
fn class_and_type(raw: &Value) -> Value {
    let class = str_at(raw, "class");
    let kind = str_at(raw, "type");
    let label = match (class.is_empty(), kind.is_empty()) {
        (false, false) => match class {
            "place" | "highway" | "building" => kind.to_string(),
            _ => format!("{class}_{kind}"),
        },
        (false, true) => class.to_string(),
        (true, false) => kind.to_string(),
        (true, true) => String::new(),
    };
    Value::String(label)
}

fn lat_as_number(raw: &Value) -> Value {
    f64_at(raw, "lat").map(Value::from).unwrap_or(Value::Null)
}

fn lon_as_number(raw: &Value) -> Value {
    f64_at(raw, "lon").map(Value::from).unwrap_or(Value::Null)
}

fn osm_id_as_integer(raw: &Value) -> Value {
    match nested_value(raw, "osm_id") {
        Some(Value::Number(n)) => Value::Number(n.clone()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn osm_type_upper(raw: &Value) -> Value {
    let osm_type = str_at(raw, "osm_type");
    if osm_type.is_empty() {
        Value::Null
    } else {
        Value::String(osm_type.to_uppercase())
    }
}

fn first_non_empty(raw: &Value, paths: &[&str]) -> Value {
    for path in paths {
        let found = str_at(raw, path);
        if !found.is_empty() {
            return Value::String(found.to_string());
        }
    }
    Value::String(String::new())
}

/// The `features` array of a GeoJSON response, empty when absent.
pub(crate) fn features_array(payload: &Value) -> Vec<Value> {
    payload
        .get("features")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Vendors report failures inline as `{"error": ...}` with a 200 status.
pub(crate) fn has_error_key(payload: &Value) -> bool {
    payload.get("error").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_from_mapping;
    use serde_json::json;

    fn sample_feature() -> Value {
        json!({
            "place_id": 240109189,
            "osm_type": "way",
            "osm_id": 24845766,
            "lat": "48.8588897",
            "lon": "2.3200410",
            "class": "highway",
            "type": "residential",
            "address": {
                "house_number": "12",
                "road": "Rue de Rivoli",
                "city": "Paris",
                "postcode": "75001",
                "state": "Ile-de-France",
                "country": "France",
                "country_code": "fr",
                "suburb": "Quartier Saint-Germain"
            }
        })
    }

    #[test]
    fn osm_mapping_extracts_all_components() {
        let record = normalize_from_mapping(&sample_feature(), OSM_ADDRESS_MAPPING);

        assert_eq!(record.get_str(Field::Reference), Some("240109189"));
        assert_eq!(record.get_str(Field::AddressLine1), Some("12 Rue de Rivoli"));
        assert_eq!(record.get_str(Field::City), Some("Paris"));
        assert_eq!(record.get_str(Field::PostalCode), Some("75001"));
        assert_eq!(record.get_str(Field::State), Some("Ile-de-France"));
        assert_eq!(record.get_str(Field::CountryCode), Some("FR"));
        assert_eq!(
            record.get_str(Field::Neighbourhood),
            Some("Quartier Saint-Germain")
        );
        assert_eq!(record.get_str(Field::AddressType), Some("residential"));
        assert_eq!(record.latitude(), Some(48.8588897));
        assert_eq!(record.longitude(), Some(2.3200410));
        assert_eq!(record.get_f64(Field::OsmId), Some(24845766.0));
        assert_eq!(record.get_str(Field::OsmType), Some("W"));
    }

    #[test]
    fn road_without_house_number_stands_alone() {
        let feature = json!({"address": {"road": "Rue de Rivoli"}});
        let record = normalize_from_mapping(&feature, OSM_ADDRESS_MAPPING);
        assert_eq!(record.get_str(Field::AddressLine1), Some("Rue de Rivoli"));
    }

    #[test]
    fn town_fills_in_for_missing_city() {
        let feature = json!({"address": {"town": "Giverny"}});
        let record = normalize_from_mapping(&feature, OSM_ADDRESS_MAPPING);
        assert_eq!(record.get_str(Field::City), Some("Giverny"));
    }

    #[test]
    fn class_type_pair_flattens() {
        let amenity = json!({"class": "amenity", "type": "restaurant"});
        let record = normalize_from_mapping(&amenity, OSM_ADDRESS_MAPPING);
        assert_eq!(
            record.get_str(Field::AddressType),
            Some("amenity_restaurant")
        );

        let place = json!({"class": "place", "type": "city"});
        let record = normalize_from_mapping(&place, OSM_ADDRESS_MAPPING);
        assert_eq!(record.get_str(Field::AddressType), Some("city"));

        let bare = json!({"class": "boundary"});
        let record = normalize_from_mapping(&bare, OSM_ADDRESS_MAPPING);
        assert_eq!(record.get_str(Field::AddressType), Some("boundary"));
    }

    #[test]
    fn missing_reference_is_absent_not_empty() {
        let record = normalize_from_mapping(&json!({}), OSM_ADDRESS_MAPPING);
        assert!(!record.contains(Field::Reference));
        assert_eq!(record.get_str(Field::AddressLine2), Some(""));
    }
}
