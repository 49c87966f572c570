//! OpenCage. One `/json` endpoint serves forward and reverse lookups;
//! a native 0-10/100 confidence score replaces the importance heuristic.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::normalize::{f64_at, parse_proximity, str_at};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_REVERSE, OP_SEARCH, OsmQuery, ProviderError,
    ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle, finalize_record, http_client,
};
use crate::scoring::round2;
use crate::schema::{AddressRecord, Field};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "opencage",
    display_name: "OpenCage",
    description: "OpenCage provider",
    documentation_url: "https://opencagedata.com/api",
    site_url: "https://opencagedata.com",
    operations: &[OP_SEARCH, OP_REVERSE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(500);

pub struct OpenCage {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    api_key: Option<String>,
}

impl OpenCage {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.opencage_base_url.clone(),
            api_key: config.opencage_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "OPENCAGE_API_KEY",
            })
    }

    async fn query_json(&self, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        self.throttle.wait().await;
        let payload = self
            .client
            .get(format!("{}/json", self.base_url))
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    fn normalize(&self, item: &Value, search_query: Option<&str>) -> AddressRecord {
        let record = extract_result(item);
        finalize_record(record, &METADATA, native_confidence(item), search_query)
    }
}

/// OpenCage reports a 1-10 confidence on a 0-100-meter scale; the API docs
/// define it out of 100, which maps it into the canonical 0-1 range.
fn native_confidence(item: &Value) -> f64 {
    match f64_at(item, "confidence") {
        Some(value) if value != 0.0 => round2(value / 100.0),
        _ => 0.0,
    }
}

fn extract_result(item: &Value) -> AddressRecord {
    let mut record = AddressRecord::new();

    let house_number = str_at(item, "components.house_number");
    let road = str_at(item, "components.road");
    let address_line1 = if !house_number.is_empty() && !road.is_empty() {
        format!("{house_number} {road}")
    } else if !road.is_empty() {
        road.to_string()
    } else {
        // Fall back to the first comma-separated part of the formatted
        // display string.
        str_at(item, "formatted")
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_string()
    };
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    let city = first_of(item, &["components.city", "components.town", "components.village"]);
    record.insert_str(Field::City, city);
    record.insert_str(Field::PostalCode, str_at(item, "components.postcode"));
    record.insert_str(
        Field::State,
        first_of(item, &["components.state", "components.state_district"]),
    );
    record.insert_str(Field::Region, str_at(item, "components.region"));
    record.insert_str(Field::Country, str_at(item, "components.country"));
    record.insert_str(
        Field::CountryCode,
        str_at(item, "components.country_code").to_uppercase(),
    );
    record.insert_str(Field::Municipality, str_at(item, "components.municipality"));
    record.insert_str(
        Field::Neighbourhood,
        first_of(
            item,
            &[
                "components.suburb",
                "components.neighbourhood",
                "components.quarter",
                "components.district",
            ],
        ),
    );
    record.insert_str(Field::AddressType, str_at(item, "components._type"));

    let geohash = str_at(item, "annotations.geohash");
    if !geohash.is_empty() {
        record.insert_str(Field::Reference, geohash);
    }

    if let Some(lat) = f64_at(item, "geometry.lat") {
        record.insert_f64(Field::Latitude, lat);
    }
    if let Some(lon) = f64_at(item, "geometry.lng") {
        record.insert_f64(Field::Longitude, lon);
    }

    record
}

fn first_of<'a>(item: &'a Value, paths: &[&str]) -> &'a str {
    paths
        .iter()
        .map(|path| str_at(item, path))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

#[async_trait]
impl GeocodingProvider for OpenCage {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let mut params = vec![
            ("key", self.api_key()?.to_string()),
            ("q", query.to_string()),
            ("limit", options.limit.to_string()),
            ("no_annotations", "0".to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("proximity", format!("{lat},{lon}")));
        }

        let payload = self.query_json(&params).await?;
        let results = payload
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if options.raw {
            return Ok(Resolved::Raw(results));
        }
        if super::has_error_key(&payload) {
            return Ok(Resolved::Records(Vec::new()));
        }
        let records = results
            .iter()
            .map(|item| self.normalize(item, Some(query)))
            .collect();
        Ok(Resolved::Records(records))
    }

    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("q", format!("{latitude},{longitude}")),
            ("no_annotations", "0".to_string()),
        ];
        let payload = self.query_json(&params).await?;
        if super::has_error_key(&payload) {
            return Ok(None);
        }
        let results = payload
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(item) = results.first() else {
            return Ok(None);
        };
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(item.clone())));
        }
        let mut record = extract_result(item);
        // The queried point is the authoritative position for a reverse
        // lookup.
        record.insert_f64(Field::Latitude, latitude);
        record.insert_f64(Field::Longitude, longitude);
        let record = finalize_record(record, &METADATA, native_confidence(item), None);
        Ok(Some(ResolvedOne::Record(Box::new(record))))
    }

    async fn get_address_by_reference(
        &self,
        _reference: &str,
        _options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        Err(ProviderError::unsupported(
            "OpenCage",
            "get_address_by_reference",
        ))
    }

    async fn get_address_by_osm(
        &self,
        _query: &OsmQuery,
        _options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        Err(ProviderError::unsupported("OpenCage", "get_address_by_osm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_components_and_geohash_reference() {
        let item = json!({
            "components": {
                "house_number": "221B",
                "road": "Baker Street",
                "city": "London",
                "postcode": "NW1 6XE",
                "state": "England",
                "country": "United Kingdom",
                "country_code": "gb",
                "suburb": "Marylebone",
                "_type": "building"
            },
            "annotations": {"geohash": "gcpvj0e5m"},
            "geometry": {"lat": 51.5237629, "lng": -0.1584743},
            "confidence": 9
        });

        let record = extract_result(&item);
        assert_eq!(record.get_str(Field::AddressLine1), Some("221B Baker Street"));
        assert_eq!(record.get_str(Field::City), Some("London"));
        assert_eq!(record.get_str(Field::CountryCode), Some("GB"));
        assert_eq!(record.get_str(Field::Neighbourhood), Some("Marylebone"));
        assert_eq!(record.get_str(Field::Reference), Some("gcpvj0e5m"));
        assert_eq!(record.latitude(), Some(51.5237629));

        assert_eq!(native_confidence(&item), 0.09);
    }

    #[test]
    fn formatted_fallback_for_line1() {
        let item = json!({
            "components": {"city": "Paris"},
            "formatted": "Louvre, 75001 Paris, France"
        });
        let record = extract_result(&item);
        assert_eq!(record.get_str(Field::AddressLine1), Some("Louvre"));
    }

    #[test]
    fn zero_confidence_stays_zero() {
        assert_eq!(native_confidence(&json!({"confidence": 0})), 0.0);
        assert_eq!(native_confidence(&json!({})), 0.0);
    }
}
