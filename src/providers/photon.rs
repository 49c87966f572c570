//! Photon, komoot's open GeoJSON geocoder. No credentials needed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::Value;

use crate::config::Config;
use crate::normalize::{f64_at, parse_proximity, str_at};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_REVERSE, OP_SEARCH, OsmQuery, ProviderError,
    ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle, enrich_generic, http_client,
};
use crate::schema::{AddressRecord, Field};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "photon",
    display_name: "Photon",
    description: "Photon provider",
    documentation_url: "https://photon.komoot.io/docs",
    site_url: "https://photon.komoot.io",
    operations: &[OP_SEARCH, OP_REVERSE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(100);
const IMPORTANCE_KEY: &str = "properties.importance";

pub struct Photon {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    user_agent: String,
}

impl Photon {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.photon_base_url.clone(),
            user_agent: config.photon_user_agent.clone(),
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        self.throttle.wait().await;
        let payload = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(USER_AGENT, &self.user_agent)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    fn normalize(&self, feature: &Value, search_query: Option<&str>) -> AddressRecord {
        let record = extract_feature(feature);
        enrich_generic(record, &METADATA, feature, IMPORTANCE_KEY, search_query)
    }
}

fn extract_feature(feature: &Value) -> AddressRecord {
    let mut record = AddressRecord::new();

    let house_number = str_at(feature, "properties.housenumber");
    let street = str_at(feature, "properties.street");
    let address_line1 = if !house_number.is_empty() && !street.is_empty() {
        format!("{house_number} {street}")
    } else {
        street.to_string()
    };
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    let city = ["properties.city", "properties.town", "properties.village"]
        .iter()
        .map(|path| str_at(feature, path))
        .find(|v| !v.is_empty())
        .unwrap_or("");
    record.insert_str(Field::City, city);
    record.insert_str(Field::PostalCode, str_at(feature, "properties.postcode"));
    record.insert_str(Field::State, str_at(feature, "properties.state"));
    record.insert_str(Field::Region, str_at(feature, "properties.region"));
    record.insert_str(Field::Country, str_at(feature, "properties.country"));
    record.insert_str(
        Field::CountryCode,
        str_at(feature, "properties.countrycode").to_uppercase(),
    );
    record.insert_str(
        Field::Municipality,
        str_at(feature, "properties.municipality"),
    );

    let neighbourhood = [
        "properties.district",
        "properties.suburb",
        "properties.quarter",
        "properties.neighbourhood",
    ]
    .iter()
    .map(|path| str_at(feature, path))
    .find(|v| !v.is_empty())
    .unwrap_or("");
    record.insert_str(Field::Neighbourhood, neighbourhood);

    // Photon exposes the element's tag as osm_key/osm_value, same
    // flattening as the Nominatim class/type pair.
    let osm_key = str_at(feature, "properties.osm_key");
    let osm_value = str_at(feature, "properties.osm_value");
    let address_type = match (osm_key.is_empty(), osm_value.is_empty()) {
        (false, false) => match osm_key {
            "place" | "highway" | "building" => osm_value.to_string(),
            _ => format!("{osm_key}_{osm_value}"),
        },
        (false, true) => osm_key.to_string(),
        (true, false) => osm_value.to_string(),
        (true, true) => String::new(),
    };
    record.insert_str(Field::AddressType, address_type);

    let osm_id = f64_at(feature, "properties.osm_id");
    let osm_type = str_at(feature, "properties.osm_type");
    if let Some(osm_id) = osm_id {
        record.insert_f64(Field::OsmId, osm_id);
        if !osm_type.is_empty() {
            record.insert_str(Field::Reference, format!("{osm_type}:{}", osm_id as i64));
        }
    }
    if !osm_type.is_empty() {
        record.insert_str(Field::OsmType, osm_type);
    }

    // GeoJSON coordinates come longitude first.
    if let Some(coords) = feature
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
        && coords.len() >= 2
        && let (Some(lon), Some(lat)) = (coords[0].as_f64(), coords[1].as_f64())
    {
        record.insert_f64(Field::Latitude, lat);
        record.insert_f64(Field::Longitude, lon);
    }

    record
}

#[async_trait]
impl GeocodingProvider for Photon {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("limit", options.limit.to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("lat", lat.to_string()));
            params.push(("lon", lon.to_string()));
        }

        let payload = self.get("/api", &params).await?;
        let features = super::features_array(&payload);
        if options.raw {
            return Ok(Resolved::Raw(features));
        }
        if super::has_error_key(&payload) {
            return Ok(Resolved::Records(Vec::new()));
        }
        let records = features
            .iter()
            .map(|feature| self.normalize(feature, Some(query)))
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
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("limit", "1".to_string()),
        ];
        let payload = self.get("/reverse", &params).await?;
        if super::has_error_key(&payload) {
            return Ok(None);
        }
        let features = super::features_array(&payload);
        let Some(feature) = features.first() else {
            return Ok(None);
        };
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(feature.clone())));
        }
        Ok(Some(ResolvedOne::Record(Box::new(
            self.normalize(feature, None),
        ))))
    }

    async fn get_address_by_reference(
        &self,
        _reference: &str,
        _options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        Err(ProviderError::unsupported(
            "Photon",
            "get_address_by_reference",
        ))
    }

    async fn get_address_by_osm(
        &self,
        _query: &OsmQuery,
        _options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        Err(ProviderError::unsupported("Photon", "get_address_by_osm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_geojson_feature() {
        let feature = json!({
            "geometry": {"coordinates": [13.3888599, 52.5170365], "type": "Point"},
            "properties": {
                "osm_id": 38345682,
                "osm_type": "W",
                "osm_key": "highway",
                "osm_value": "residential",
                "housenumber": "1",
                "street": "Unter den Linden",
                "city": "Berlin",
                "postcode": "10117",
                "state": "Berlin",
                "country": "Germany",
                "countrycode": "DE",
                "importance": 0.42
            }
        });

        let record = extract_feature(&feature);
        assert_eq!(
            record.get_str(Field::AddressLine1),
            Some("1 Unter den Linden")
        );
        assert_eq!(record.get_str(Field::City), Some("Berlin"));
        assert_eq!(record.get_str(Field::CountryCode), Some("DE"));
        assert_eq!(record.get_str(Field::AddressType), Some("residential"));
        assert_eq!(record.get_str(Field::Reference), Some("W:38345682"));
        assert_eq!(record.latitude(), Some(52.5170365));
        assert_eq!(record.longitude(), Some(13.3888599));
    }

    #[test]
    fn street_only_line1_and_district_neighbourhood() {
        let feature = json!({
            "properties": {
                "street": "Friedrichstrasse",
                "district": "Mitte"
            }
        });
        let record = extract_feature(&feature);
        assert_eq!(record.get_str(Field::AddressLine1), Some("Friedrichstrasse"));
        assert_eq!(record.get_str(Field::Neighbourhood), Some("Mitte"));
        assert!(!record.contains(Field::Reference));
        assert!(record.latitude().is_none());
    }
}
