//! Geoapify. GeoJSON features whose properties duplicate the coordinates
//! and often ship a ready-made address_line1.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::normalize::{f64_at, nested_value, parse_proximity, str_at};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_REFERENCE, OP_REVERSE, OP_SEARCH, OsmQuery,
    ProviderError, ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle,
    enrich_generic, http_client,
};
use crate::schema::{AddressRecord, Field};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "geoapify",
    display_name: "Geoapify",
    description: "Geoapify provider",
    documentation_url: "https://apidocs.geoapify.com/docs/geocoding/",
    site_url: "https://www.geoapify.com",
    operations: &[OP_SEARCH, OP_REVERSE, OP_REFERENCE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(100);
const IMPORTANCE_KEY: &str = "properties.rank.confidence";

pub struct Geoapify {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    api_key: Option<String>,
}

impl Geoapify {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.geoapify_base_url.clone(),
            api_key: config.geoapify_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "GEOAPIFY_API_KEY",
            })
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        self.throttle.wait().await;
        let payload = self
            .client
            .get(format!("{}{path}", self.base_url))
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

    let mut address_line1 = str_at(feature, "properties.address_line1").to_string();
    if address_line1.is_empty() {
        let house_number = str_at(feature, "properties.housenumber");
        let street = str_at(feature, "properties.street");
        address_line1 = [house_number, street]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
    }
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    let city = first_of(
        feature,
        &["properties.city", "properties.town", "properties.village"],
    );
    record.insert_str(Field::City, city);
    record.insert_str(Field::PostalCode, str_at(feature, "properties.postcode"));
    record.insert_str(
        Field::State,
        first_of(feature, &["properties.state", "properties.state_code"]),
    );
    record.insert_str(Field::Region, str_at(feature, "properties.region"));
    record.insert_str(Field::Country, str_at(feature, "properties.country"));
    record.insert_str(
        Field::CountryCode,
        str_at(feature, "properties.country_code").to_uppercase(),
    );
    record.insert_str(
        Field::Municipality,
        str_at(feature, "properties.municipality"),
    );
    record.insert_str(
        Field::Neighbourhood,
        first_of(
            feature,
            &[
                "properties.neighbourhood",
                "properties.suburb",
                "properties.district",
                "properties.quarter",
            ],
        ),
    );
    record.insert_str(
        Field::AddressType,
        first_of(feature, &["properties.type", "properties.category"]),
    );

    let place_id = str_at(feature, "properties.place_id");
    let reference = if place_id.is_empty() {
        str_at(feature, "id")
    } else {
        place_id
    };
    if !reference.is_empty() {
        record.insert_str(Field::Reference, reference);
    }

    copy_coordinates(feature, &mut record);
    record
}

// Coordinates live both in properties.lat/lon and in the GeoJSON
// geometry; properties win, geometry fills the gaps.
fn copy_coordinates(feature: &Value, record: &mut AddressRecord) {
    if let Some(lat) = f64_at(feature, "properties.lat") {
        record.insert_f64(Field::Latitude, lat);
    }
    if let Some(lon) = f64_at(feature, "properties.lon") {
        record.insert_f64(Field::Longitude, lon);
    }
    if record.latitude().is_some() && record.longitude().is_some() {
        return;
    }
    if let Some(coords) = nested_value(feature, "geometry.coordinates").and_then(Value::as_array)
        && coords.len() >= 2
    {
        if record.longitude().is_none()
            && let Some(lon) = coords[0].as_f64()
        {
            record.insert_f64(Field::Longitude, lon);
        }
        if record.latitude().is_none()
            && let Some(lat) = coords[1].as_f64()
        {
            record.insert_f64(Field::Latitude, lat);
        }
    }
}

fn first_of<'a>(feature: &'a Value, paths: &[&str]) -> &'a str {
    paths
        .iter()
        .map(|path| str_at(feature, path))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

#[async_trait]
impl GeocodingProvider for Geoapify {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let mut params = vec![
            ("apiKey", self.api_key()?.to_string()),
            ("text", query.to_string()),
            ("limit", options.limit.to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("bias", format!("proximity:{lon},{lat}")));
        }

        let payload = self.get("/geocode/search", &params).await?;
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
            ("apiKey", self.api_key()?.to_string()),
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
        ];
        let payload = self.get("/geocode/reverse", &params).await?;
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
        let mut record = extract_feature(feature);
        record.insert_f64(Field::Latitude, latitude);
        record.insert_f64(Field::Longitude, longitude);
        let record = enrich_generic(record, &METADATA, feature, IMPORTANCE_KEY, None);
        Ok(Some(ResolvedOne::Record(Box::new(record))))
    }

    async fn get_address_by_reference(
        &self,
        reference: &str,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [
            ("apiKey", self.api_key()?.to_string()),
            ("place_id", reference.to_string()),
        ];
        let payload = self.get("/geocode/search", &params).await?;
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

    async fn get_address_by_osm(
        &self,
        _query: &OsmQuery,
        _options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        Err(ProviderError::unsupported("Geoapify", "get_address_by_osm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_ready_made_line1_and_property_coordinates() {
        let feature = json!({
            "geometry": {"coordinates": [0.0, 0.0]},
            "properties": {
                "address_line1": "38 Quai des Grands Augustins",
                "city": "Paris",
                "postcode": "75006",
                "country_code": "fr",
                "lat": 48.854032,
                "lon": 2.342989,
                "place_id": "51abc",
                "type": "amenity",
                "rank": {"confidence": 0.95}
            }
        });
        let record = extract_feature(&feature);
        assert_eq!(
            record.get_str(Field::AddressLine1),
            Some("38 Quai des Grands Augustins")
        );
        assert_eq!(record.latitude(), Some(48.854032));
        assert_eq!(record.longitude(), Some(2.342989));
        assert_eq!(record.get_str(Field::Reference), Some("51abc"));
    }

    #[test]
    fn geometry_backfills_missing_property_coordinates() {
        let feature = json!({
            "geometry": {"coordinates": [2.35, 48.85]},
            "properties": {"street": "Rue de Rivoli"}
        });
        let record = extract_feature(&feature);
        assert_eq!(record.get_str(Field::AddressLine1), Some("Rue de Rivoli"));
        assert_eq!(record.latitude(), Some(48.85));
        assert_eq!(record.longitude(), Some(2.35));
    }
}
