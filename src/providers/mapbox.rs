//! Mapbox geocoding v5. The query is a path segment rather than a query
//! parameter, and address context arrives as a typed ancestor array.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::config::Config;
use crate::normalize::{nested_value, parse_proximity, str_at};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_REFERENCE, OP_REVERSE, OP_SEARCH, OsmQuery,
    ProviderError, ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle,
    enrich_generic, http_client,
};
use crate::schema::{AddressRecord, Field};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "mapbox",
    display_name: "Mapbox",
    description: "Mapbox provider",
    documentation_url: "https://docs.mapbox.com/api/search/geocoding/",
    site_url: "https://www.mapbox.com",
    operations: &[OP_SEARCH, OP_REVERSE, OP_REFERENCE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(100);
const IMPORTANCE_KEY: &str = "relevance";

pub struct Mapbox {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    access_token: Option<String>,
}

impl Mapbox {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.mapbox_base_url.clone(),
            access_token: config.mapbox_access_token.clone(),
        }
    }

    fn access_token(&self) -> Result<&str, ProviderError> {
        self.access_token
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "MAPBOX_ACCESS_TOKEN",
            })
    }

    /// Builds `{base}/geocoding/v5/mapbox.places/{query}.json` with the
    /// query percent-encoded as a path segment.
    fn places_url(&self, query: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::malformed(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::malformed("base url cannot carry a path"))?
            .extend(["geocoding", "v5", "mapbox.places", &format!("{query}.json")]);
        Ok(url)
    }

    async fn get(&self, url: Url, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        self.throttle.wait().await;
        let payload = self
            .client
            .get(url)
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

fn context_text<'a>(context: &'a [Value], prefix: &str) -> &'a str {
    context
        .iter()
        .find(|item| str_at(item, "id").starts_with(prefix))
        .map(|item| str_at(item, "text"))
        .unwrap_or("")
}

fn extract_feature(feature: &Value) -> AddressRecord {
    let mut record = AddressRecord::new();
    let empty = Vec::new();
    let context = feature
        .get("context")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut address_line1 = str_at(feature, "properties.address").to_string();
    if address_line1.is_empty() {
        address_line1 = str_at(feature, "place_name")
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
    }
    if address_line1.is_empty() {
        let number = str_at(feature, "properties.address_number");
        let street = str_at(feature, "properties.street");
        address_line1 = [number, street]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
    }
    if address_line1.is_empty() {
        address_line1 = str_at(feature, "text").to_string();
    }
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    record.insert_str(Field::City, context_text(context, "place"));
    record.insert_str(Field::PostalCode, context_text(context, "postcode"));

    // The first region entry is the state; a second one, where present,
    // is the broader region.
    let mut state = "";
    let mut region = "";
    for item in context {
        if str_at(item, "id").starts_with("region") {
            let text = str_at(item, "text");
            if text.is_empty() {
                continue;
            }
            if state.is_empty() {
                state = text;
            } else {
                region = text;
            }
        }
    }
    record.insert_str(Field::State, state);
    record.insert_str(Field::Region, region);

    let country = context
        .iter()
        .find(|item| str_at(item, "id").starts_with("country"));
    if let Some(country) = country {
        record.insert_str(Field::Country, str_at(country, "text"));
        record.insert_str(
            Field::CountryCode,
            str_at(country, "short_code").to_uppercase(),
        );
    } else {
        record.insert_str(Field::Country, "");
        record.insert_str(Field::CountryCode, "");
    }

    record.insert_str(Field::Municipality, context_text(context, "district"));
    record.insert_str(Field::Neighbourhood, context_text(context, "neighborhood"));
    record.insert_str(Field::AddressType, str_at(feature, "properties.type"));

    let feature_id = str_at(feature, "id");
    if !feature_id.is_empty() {
        record.insert_str(Field::Reference, feature_id);
    }

    if let Some(coords) = nested_value(feature, "geometry.coordinates").and_then(Value::as_array)
        && coords.len() >= 2
        && let (Some(lon), Some(lat)) = (coords[0].as_f64(), coords[1].as_f64())
    {
        record.insert_f64(Field::Latitude, lat);
        record.insert_f64(Field::Longitude, lon);
    }

    record
}

#[async_trait]
impl GeocodingProvider for Mapbox {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let mut params = vec![
            ("access_token", self.access_token()?.to_string()),
            ("limit", options.limit.to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            // Mapbox expects longitude,latitude.
            params.push(("proximity", format!("{lon},{lat}")));
        }

        let url = self.places_url(query)?;
        let payload = self.get(url, &params).await?;
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
            ("access_token", self.access_token()?.to_string()),
            ("limit", "1".to_string()),
        ];
        let url = self.places_url(&format!("{longitude},{latitude}"))?;
        let payload = self.get(url, &params).await?;
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
        reference: &str,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [("access_token", self.access_token()?.to_string())];
        let url = self.places_url(reference)?;
        let payload = self.get(url, &params).await?;
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
        Err(ProviderError::unsupported("Mapbox", "get_address_by_osm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_context_ancestors() {
        let feature = json!({
            "id": "address.1234",
            "text": "Market Street",
            "place_name": "600 Market Street, San Francisco, California, United States",
            "relevance": 0.96,
            "geometry": {"coordinates": [-122.4018, 37.7886]},
            "properties": {},
            "context": [
                {"id": "neighborhood.501", "text": "Financial District"},
                {"id": "postcode.9401", "text": "94104"},
                {"id": "place.292", "text": "San Francisco"},
                {"id": "region.9", "text": "California"},
                {"id": "country.87", "text": "United States", "short_code": "us"}
            ]
        });

        let record = extract_feature(&feature);
        assert_eq!(record.get_str(Field::AddressLine1), Some("600 Market Street"));
        assert_eq!(record.get_str(Field::City), Some("San Francisco"));
        assert_eq!(record.get_str(Field::PostalCode), Some("94104"));
        assert_eq!(record.get_str(Field::State), Some("California"));
        assert_eq!(record.get_str(Field::CountryCode), Some("US"));
        assert_eq!(record.get_str(Field::Neighbourhood), Some("Financial District"));
        assert_eq!(record.get_str(Field::Reference), Some("address.1234"));
        assert_eq!(record.latitude(), Some(37.7886));
    }

    #[test]
    fn second_region_entry_becomes_region() {
        let feature = json!({
            "text": "Somewhere",
            "context": [
                {"id": "region.1", "text": "Bavaria"},
                {"id": "region.2", "text": "Southern Germany"}
            ]
        });
        let record = extract_feature(&feature);
        assert_eq!(record.get_str(Field::State), Some("Bavaria"));
        assert_eq!(record.get_str(Field::Region), Some("Southern Germany"));
    }
}
