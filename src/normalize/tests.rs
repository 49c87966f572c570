use super::*;
use serde_json::json;

fn house_and_road(raw: &Value) -> Value {
    let house = str_at(raw, "address.house_number");
    let road = str_at(raw, "address.road");
    if !house.is_empty() && !road.is_empty() {
        Value::String(format!("{house} {road}"))
    } else {
        Value::String(road.to_string())
    }
}

static TEST_MAPPING: FieldMapping = &[
    (Field::AddressLine1, MappingRule::Transform(house_and_road)),
    (Field::AddressLine2, MappingRule::Constant("")),
    (Field::PostalCode, MappingRule::Path("address.postcode")),
    (Field::Country, MappingRule::Path("address.country")),
];

#[test]
fn only_mapped_fields_are_populated() {
    let raw = json!({
        "address": {
            "house_number": "10",
            "road": "Main St",
            "postcode": "75001",
            "country": "France",
            "city": "Paris"
        }
    });

    let record = normalize_from_mapping(&raw, TEST_MAPPING);
    assert_eq!(record.get_str(Field::AddressLine1), Some("10 Main St"));
    assert_eq!(record.get_str(Field::AddressLine2), Some(""));
    assert_eq!(record.get_str(Field::PostalCode), Some("75001"));
    assert_eq!(record.get_str(Field::Country), Some("France"));
    // "city" exists in the payload but has no mapping entry.
    assert!(!record.contains(Field::City));
    assert_eq!(record.len(), 4);
}

#[test]
fn missing_path_intermediates_short_circuit() {
    let raw = json!({"address": "not an object"});
    let record = normalize_from_mapping(&raw, TEST_MAPPING);
    assert!(!record.contains(Field::PostalCode));
    assert!(!record.contains(Field::Country));

    assert_eq!(nested_value(&json!({}), "a.b.c"), None);
    assert_eq!(nested_value(&json!({"a": {"b": 1}}), "a.b.c"), None);
    assert_eq!(
        nested_value(&json!({"a": {"b": {"c": 3}}}), "a.b.c"),
        Some(&json!(3))
    );
}

#[test]
fn null_transform_results_leave_field_absent() {
    static MAPPING: FieldMapping = &[(Field::OsmId, MappingRule::Transform(|_| Value::Null))];
    let record = normalize_from_mapping(&json!({}), MAPPING);
    assert!(record.is_empty());
}

#[test]
fn f64_at_coerces_numeric_strings() {
    let raw = json!({"lat": "48.85", "lon": 2.35, "name": "x"});
    assert_eq!(f64_at(&raw, "lat"), Some(48.85));
    assert_eq!(f64_at(&raw, "lon"), Some(2.35));
    assert_eq!(f64_at(&raw, "name"), None);
    assert_eq!(f64_at(&raw, "missing"), None);
}

#[test]
fn address_text_skips_empty_components() {
    let mut record = AddressRecord::new();
    record.insert_str(Field::AddressLine1, "10 Main St");
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::City, "Paris");
    record.insert_str(Field::PostalCode, "75001");
    record.insert_str(Field::CountryCode, "FR");
    assert_eq!(build_address_text(&record), "10 Main St, Paris, 75001, FR");

    assert_eq!(build_address_text(&AddressRecord::new()), "");
}

#[test]
fn proximity_parsing() {
    assert_eq!(parse_proximity("48.85, 2.35"), Some((48.85, 2.35)));
    assert_eq!(parse_proximity("48.85,2.35"), Some((48.85, 2.35)));
    assert_eq!(parse_proximity(""), None);
    assert_eq!(parse_proximity("48.85"), None);
    assert_eq!(parse_proximity("x,y"), None);
    assert_eq!(parse_proximity("1,2,3"), None);
}

#[test]
fn geoaddress_id_requires_reference_and_backend() {
    let mut record = AddressRecord::new();
    record.insert_str(Field::BackendName, "nominatim");
    assert_eq!(geoaddress_id(&record), None);

    record.insert_str(Field::Reference, "");
    assert_eq!(geoaddress_id(&record), None);

    record.insert_str(Field::Reference, "12345");
    assert_eq!(geoaddress_id(&record), Some("nominatim-12345".to_string()));
}
