//! Shape guarantees of the canonical record as seen by library consumers.

use serde_json::{Value, json};

use geoaddress::{AddressRecord, Field};

#[test]
fn serialized_keys_follow_catalog_order() {
    let mut record = AddressRecord::new();
    // Insert in deliberately scrambled order.
    record.insert_str(Field::BackendName, "nominatim");
    record.insert_f64(Field::Latitude, 48.85);
    record.insert_str(Field::City, "Paris");
    record.insert_str(Field::Text, "Paris, FR");
    record.insert_str(Field::CountryCode, "FR");

    let serialized = serde_json::to_string(&record).unwrap();
    let text_pos = serialized.find("\"text\"").unwrap();
    let city_pos = serialized.find("\"city\"").unwrap();
    let country_pos = serialized.find("\"country_code\"").unwrap();
    let latitude_pos = serialized.find("\"latitude\"").unwrap();
    let backend_pos = serialized.find("\"backend_name\"").unwrap();
    assert!(text_pos < city_pos);
    assert!(city_pos < country_pos);
    assert!(country_pos < latitude_pos);
    assert!(latitude_pos < backend_pos);
}

#[test]
fn absent_fields_are_omitted_not_nulled() {
    let mut record = AddressRecord::new();
    record.insert(Field::City, json!("Lyon"));
    record.insert(Field::PostalCode, Value::Null);

    let value = record.to_value();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(!object.contains_key("postal_code"));
}

#[test]
fn field_catalog_is_stable() {
    assert_eq!(Field::ALL.len(), 22);
    for field in Field::ALL {
        assert_eq!(Field::from_str_opt(field.as_str()), Some(field));
        assert!(!field.description().is_empty());
    }
}
