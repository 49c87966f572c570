use super::*;
use serde_json::json;

#[test]
fn catalog_has_twenty_two_fields() {
    assert_eq!(Field::ALL.len(), 22);
}

#[test]
fn field_names_round_trip() {
    for field in Field::ALL {
        assert_eq!(Field::from_str_opt(field.as_str()), Some(field));
        assert!(!field.description().is_empty());
    }
}

#[test]
fn catalog_order_matches_declaration() {
    let mut sorted = Field::ALL.to_vec();
    sorted.sort();
    assert_eq!(sorted, Field::ALL.to_vec());
    assert_eq!(Field::ALL[0], Field::Text);
    assert_eq!(Field::ALL[21], Field::GeoaddressId);
}

#[test]
fn record_serializes_in_catalog_order() {
    let mut record = AddressRecord::new();
    // Inserted in reverse of the catalog on purpose.
    record.insert_str(Field::GeoaddressId, "nominatim-42");
    record.insert_f64(Field::Latitude, 48.8566);
    record.insert_str(Field::City, "Paris");
    record.insert_str(Field::Text, "10 Rue de Rivoli, Paris");

    let json = serde_json::to_string(&record).unwrap();
    let text_pos = json.find("\"text\"").unwrap();
    let city_pos = json.find("\"city\"").unwrap();
    let lat_pos = json.find("\"latitude\"").unwrap();
    let id_pos = json.find("\"geoaddress_id\"").unwrap();
    assert!(text_pos < city_pos);
    assert!(city_pos < lat_pos);
    assert!(lat_pos < id_pos);
}

#[test]
fn null_values_are_dropped() {
    let mut record = AddressRecord::new();
    record.insert(Field::City, Value::Null);
    assert!(record.is_empty());
    assert!(!record.contains(Field::City));
}

#[test]
fn numeric_strings_coerce() {
    let mut record = AddressRecord::new();
    record.insert(Field::Latitude, json!("48.8566"));
    record.insert(Field::Longitude, json!(2.3522));
    assert_eq!(record.latitude(), Some(48.8566));
    assert_eq!(record.longitude(), Some(2.3522));
    record.insert(Field::Latitude, json!("not a number"));
    assert_eq!(record.latitude(), None);
}

#[test]
fn to_value_keeps_order() {
    let mut record = AddressRecord::new();
    record.insert_str(Field::BackendName, "photon");
    record.insert_str(Field::AddressLine1, "Hauptstrasse 1");

    let value = record.to_value();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["address_line1", "backend_name"]);
}
