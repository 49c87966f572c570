//! String comparison and great-circle helpers shared by the scorers.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Mean Earth radius in kilometers, used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Prepares text for comparison: lowercased, internal whitespace collapsed,
/// trimmed, and diacritics stripped via NFD decomposition.
///
/// Idempotent: normalizing an already-normalized string is a no-op.
pub fn normalize_for_comparison(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Haversine great-circle distance between two WGS84 points, in kilometers.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_case_and_diacritic_insensitive() {
        assert_eq!(normalize_for_comparison("Café  de Paris"), "cafe de paris");
        assert_eq!(normalize_for_comparison("CAFE DE PARIS"), "cafe de paris");
        assert_eq!(normalize_for_comparison("  Müllerstraße  "), "mullerstraße");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_for_comparison("Łódź   Śródmieście");
        assert_eq!(normalize_for_comparison(&once), once);
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(normalize_for_comparison(""), "");
        assert_eq!(normalize_for_comparison("   "), "");
    }

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert_eq!(distance_km(48.8566, 2.3522, 48.8566, 2.3522), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_km(48.8566, 2.3522, 51.5074, -0.1278);
        let ba = distance_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((ab - ba).abs() < 1e-9);
        // Paris to London is roughly 344 km.
        assert!((ab - 343.5).abs() < 2.0);
    }
}
