use serde_json::json;

use super::confidence::{DEFAULT_IMPORTANCE_MULTIPLIER, confidence, confidence_heuristic, round2};
use super::relevance::{QueryComponents, RelevanceWeights, relevance};
use crate::schema::{AddressRecord, Field};

fn record(pairs: &[(Field, &str)]) -> AddressRecord {
    let mut rec = AddressRecord::new();
    for (field, value) in pairs {
        rec.insert_str(*field, *value);
    }
    rec
}

#[test]
fn heuristic_tiers() {
    assert_eq!(
        confidence_heuristic(&record(&[(Field::AddressLine1, "10 Main St")])),
        0.9
    );
    assert_eq!(
        confidence_heuristic(&record(&[(Field::AddressLine1, "Main St")])),
        0.7
    );
    assert_eq!(confidence_heuristic(&record(&[(Field::City, "Paris")])), 0.5);
    assert_eq!(
        confidence_heuristic(&record(&[(Field::PostalCode, "75001")])),
        0.5
    );
    assert_eq!(confidence_heuristic(&AddressRecord::new()), 0.3);
}

#[test]
fn confidence_without_signal_uses_heuristic() {
    let rec = record(&[(Field::AddressLine1, "10 Main St")]);
    assert_eq!(confidence(&rec, None, None, DEFAULT_IMPORTANCE_MULTIPLIER), 0.9);

    let rec = record(&[(Field::AddressLine1, "Main St")]);
    assert_eq!(confidence(&rec, None, None, DEFAULT_IMPORTANCE_MULTIPLIER), 0.7);

    let empty = AddressRecord::new();
    assert_eq!(confidence(&empty, None, None, DEFAULT_IMPORTANCE_MULTIPLIER), 0.3);
}

#[test]
fn importance_is_scaled_and_capped() {
    let empty = AddressRecord::new();
    let feature = json!({"importance": 0.35});
    assert_eq!(
        confidence(&empty, Some(&feature), Some("importance"), 2.0),
        0.7
    );

    let feature = json!({"importance": 0.9});
    assert_eq!(
        confidence(&empty, Some(&feature), Some("importance"), 2.0),
        1.0
    );
}

#[test]
fn low_importance_falls_back_to_heuristic() {
    // 0.1 * 2.0 = 0.2 < 0.3: the derived value is discarded.
    let rec = record(&[(Field::AddressLine1, "10 Main St")]);
    let feature = json!({"importance": 0.1});
    assert_eq!(confidence(&rec, Some(&feature), Some("importance"), 2.0), 0.9);
}

#[test]
fn importance_resolves_nested_and_default_keys() {
    let empty = AddressRecord::new();

    let feature = json!({"properties": {"rank": {"confidence": 0.45}}});
    assert_eq!(
        confidence(&empty, Some(&feature), Some("properties.rank.confidence"), 2.0),
        0.9
    );

    // No explicit key: properties.importance is the fallback.
    let feature = json!({"properties": {"importance": 0.25}});
    assert_eq!(confidence(&empty, Some(&feature), None, 2.0), 0.5);
}

#[test]
fn non_numeric_importance_is_signal_absent() {
    let rec = record(&[(Field::City, "Paris")]);

    let feature = json!({"importance": {"nested": true}});
    assert_eq!(confidence(&rec, Some(&feature), Some("importance"), 2.0), 0.5);

    let feature = json!({"importance": "not a number"});
    assert_eq!(confidence(&rec, Some(&feature), Some("importance"), 2.0), 0.5);

    // Numeric strings do qualify.
    let feature = json!({"importance": "0.4"});
    assert_eq!(confidence(&rec, Some(&feature), Some("importance"), 2.0), 0.8);
}

#[test]
fn confidence_is_bounded_and_rounded() {
    let empty = AddressRecord::new();
    for importance in [0.0, 0.151, 0.333, 0.5, 1.0, 50.0] {
        let feature = json!({ "importance": importance });
        let c = confidence(&empty, Some(&feature), Some("importance"), 2.0);
        assert!((0.0..=1.0).contains(&c), "confidence {c} out of range");
        assert_eq!(c, round2(c));
    }
}

#[test]
fn relevance_full_match_with_zero_distance_is_100() {
    let query = QueryComponents {
        address_line1: Some("10 Main St".into()),
        postal_code: Some("75001".into()),
        city: Some("Paris".into()),
        ..QueryComponents::default()
    };
    let mut result = record(&[
        (Field::AddressLine1, "10 Main St"),
        (Field::PostalCode, "75001"),
        (Field::City, "Paris"),
    ]);
    result.insert_f64(Field::Latitude, 48.8566);
    result.insert_f64(Field::Longitude, 2.3522);

    let score = relevance(
        &query,
        &result,
        Some(48.8566),
        Some(2.3522),
        &RelevanceWeights::default(),
        true,
    );
    assert_eq!(score, 100.0);
}

#[test]
fn relevance_zero_weights_yield_zero() {
    let weights = RelevanceWeights {
        street: 0.0,
        postcode: 0.0,
        city: 0.0,
        distance: 0.0,
    };
    let score = relevance(
        &QueryComponents::default(),
        &AddressRecord::new(),
        None,
        None,
        &weights,
        true,
    );
    assert_eq!(score, 0.0);
}

#[test]
fn city_match_accepts_substring_containment() {
    let query = QueryComponents {
        city: Some("Paris".into()),
        ..QueryComponents::default()
    };
    let result = record(&[(Field::City, "Paris 1er Arrondissement")]);
    let weights = RelevanceWeights::default();

    let score = relevance(&query, &result, None, None, &weights, false);
    // Street matches trivially (both empty), postcode too, plus city.
    let expected = (weights.street + weights.postcode + weights.city)
        / (weights.street + weights.postcode + weights.city)
        * 100.0;
    assert_eq!(score, expected);
}

#[test]
fn city_match_is_diacritic_insensitive() {
    let query = QueryComponents {
        city: Some("Orléans".into()),
        ..QueryComponents::default()
    };
    let result = record(&[(Field::City, "ORLEANS")]);
    let score = relevance(&query, &result, None, None, &RelevanceWeights::default(), false);
    assert_eq!(score, 100.0);
}

#[test]
fn distance_weight_only_counts_when_evaluable() {
    let query = QueryComponents::from_query("10 Main St");
    let result = record(&[(Field::AddressLine1, "10 Main St")]);

    // Result has no coordinates: distance excluded from the denominator,
    // street + postcode(empty==empty) match out of street+postcode+city.
    let score = relevance(
        &query,
        &result,
        Some(48.0),
        Some(2.0),
        &RelevanceWeights::default(),
        true,
    );
    assert_eq!(score, round2((3.0 + 2.0) / 6.5 * 100.0));
}

#[test]
fn distance_decays_smoothly() {
    let query = QueryComponents::from_query("10 Main St");
    let mut near = record(&[(Field::AddressLine1, "10 Main St")]);
    near.insert_f64(Field::Latitude, 48.8566);
    near.insert_f64(Field::Longitude, 2.3522);

    let mut far = near.clone();
    far.insert_f64(Field::Latitude, 43.2965); // Marseille
    far.insert_f64(Field::Longitude, 5.3698);

    let weights = RelevanceWeights::default();
    let near_score = relevance(&query, &near, Some(48.8566), Some(2.3522), &weights, true);
    let far_score = relevance(&query, &far, Some(48.8566), Some(2.3522), &weights, true);
    assert!(near_score > far_score);
    assert!((0.0..=100.0).contains(&far_score));
}

#[test]
fn bad_coordinate_types_contribute_zero_but_count_in_max() {
    let query = QueryComponents::from_query("10 Main St");
    let mut result = record(&[(Field::AddressLine1, "10 Main St")]);
    result.insert(Field::Latitude, json!("not a latitude"));
    result.insert(Field::Longitude, json!("2.35"));

    let score = relevance(
        &query,
        &result,
        Some(48.0),
        Some(2.0),
        &RelevanceWeights::default(),
        true,
    );
    // Coordinates are present so the distance weight enters max_score, but
    // the unparsable latitude silently contributes nothing.
    assert_eq!(score, round2((3.0 + 2.0) / 7.5 * 100.0));
}

#[test]
fn round2_behaviour() {
    assert_eq!(round2(0.666), 0.67);
    assert_eq!(round2(0.664), 0.66);
    assert_eq!(round2(1.0), 1.0);
}
