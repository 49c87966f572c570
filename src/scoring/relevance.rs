//! Relevance scoring: how well a candidate matches the original query.

use crate::geo::{distance_km, normalize_for_comparison};
use crate::schema::{AddressRecord, Field};

use super::confidence::round2;

/// Weights for the individual relevance signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceWeights {
    pub street: f64,
    pub postcode: f64,
    pub city: f64,
    pub distance: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            street: 3.0,
            postcode: 2.0,
            city: 1.5,
            distance: 1.0,
        }
    }
}

/// What the caller searched for. Used only for scoring, never returned.
#[derive(Debug, Clone, Default)]
pub struct QueryComponents {
    pub address_line1: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub village: Option<String>,
    pub town: Option<String>,
    pub municipality: Option<String>,
}

impl QueryComponents {
    /// A free-text search query compared against the result's street line.
    pub fn from_query(query: &str) -> Self {
        Self {
            address_line1: Some(query.to_string()),
            ..Self::default()
        }
    }

    fn city_like(&self) -> &str {
        [&self.city, &self.village, &self.town, &self.municipality]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

/// Scores a normalized result against the query, in `[0, 100]` rounded to
/// two decimals.
///
/// Street and postcode award their weight on exact normalized equality;
/// the city signal also accepts substring containment in either direction.
/// The distance bonus `w * 1/(d_km + 1)` applies only when both sides carry
/// coordinates, and its weight enters the denominator only in that case, so
/// proximity never penalizes results that omit coordinates. With no
/// eligible signals at all the relevance is 0.
pub fn relevance(
    query: &QueryComponents,
    result: &AddressRecord,
    query_latitude: Option<f64>,
    query_longitude: Option<f64>,
    weights: &RelevanceWeights,
    include_distance: bool,
) -> f64 {
    let mut score = field_match_score(query, result, weights);
    let mut max_score = weights.street + weights.postcode + weights.city;

    let can_calculate_distance = include_distance
        && query_latitude.is_some()
        && query_longitude.is_some()
        && result.contains(Field::Latitude)
        && result.contains(Field::Longitude);

    if can_calculate_distance {
        max_score += weights.distance;
        // Non-numeric coordinate values are skipped, contributing 0.
        if let (Some(qlat), Some(qlon), Some(rlat), Some(rlon)) = (
            query_latitude,
            query_longitude,
            result.latitude(),
            result.longitude(),
        ) {
            let distance = distance_km(qlat, qlon, rlat, rlon);
            score += weights.distance * (1.0 / (distance + 1.0));
        }
    }

    if max_score > 0.0 {
        round2((score / max_score * 100.0).clamp(0.0, 100.0))
    } else {
        0.0
    }
}

fn field_match_score(
    query: &QueryComponents,
    result: &AddressRecord,
    weights: &RelevanceWeights,
) -> f64 {
    let mut score = 0.0;

    let q_street = query.address_line1.as_deref().unwrap_or("");
    let r_street = result.text_of(Field::AddressLine1);
    if normalize_for_comparison(q_street) == normalize_for_comparison(r_street) {
        score += weights.street;
    }

    let q_post = query.postal_code.as_deref().unwrap_or("");
    let r_post = result.text_of(Field::PostalCode);
    if normalize_for_comparison(q_post) == normalize_for_comparison(r_post) {
        score += weights.postcode;
    }

    let q_city = query.city_like();
    let r_city = [Field::City, Field::Municipality]
        .iter()
        .map(|f| result.text_of(*f))
        .find(|v| !v.is_empty())
        .unwrap_or("");
    if !q_city.is_empty() && !r_city.is_empty() {
        let q_city = normalize_for_comparison(q_city);
        let r_city = normalize_for_comparison(r_city);
        if q_city == r_city || r_city.contains(&q_city) || q_city.contains(&r_city) {
            score += weights.city;
        }
    }

    score
}
