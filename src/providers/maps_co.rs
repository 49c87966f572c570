//! Maps.co, a keyed Nominatim mirror on the free tier's one-per-second
//! budget.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::OSM_ADDRESS_MAPPING;
use crate::config::Config;
use crate::normalize::{normalize_from_mapping, parse_proximity};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_OSM, OP_REVERSE, OP_SEARCH, OsmQuery, ProviderError,
    ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle, enrich_generic, http_client,
};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "maps_co",
    display_name: "Maps.co",
    description: "Maps.co provider",
    documentation_url: "https://geocode.maps.co/docs/",
    site_url: "https://geocode.maps.co",
    operations: &[OP_SEARCH, OP_REVERSE, OP_OSM],
};

const MIN_INTERVAL: Duration = Duration::from_secs(1);
const IMPORTANCE_KEY: &str = "importance";

pub struct MapsCo {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    api_key: Option<String>,
}

impl MapsCo {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.maps_co_base_url.clone(),
            api_key: config.maps_co_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "MAPS_CO_API_KEY",
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

    fn collect(&self, payload: Value, raw: bool, relevance_query: Option<&str>) -> Resolved {
        let items: Vec<Value> = match payload {
            Value::Array(items) => items,
            Value::Object(_) if super::has_error_key(&payload) => Vec::new(),
            Value::Object(_) => vec![payload],
            _ => Vec::new(),
        };
        if raw {
            return Resolved::Raw(items);
        }
        let records = items
            .iter()
            .map(|feature| {
                let record = normalize_from_mapping(feature, OSM_ADDRESS_MAPPING);
                enrich_generic(record, &METADATA, feature, IMPORTANCE_KEY, relevance_query)
            })
            .collect();
        Resolved::Records(records)
    }
}

#[async_trait]
impl GeocodingProvider for MapsCo {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let mut params = vec![
            ("api_key", self.api_key()?.to_string()),
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", options.limit.to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("lat", lat.to_string()));
            params.push(("lon", lon.to_string()));
        }

        let payload = self.get("/search", &params).await?;
        Ok(self.collect(payload, options.raw, Some(query)))
    }

    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [
            ("api_key", self.api_key()?.to_string()),
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        let payload = self.get("/reverse", &params).await?;
        if !payload.is_object() || super::has_error_key(&payload) {
            return Ok(None);
        }
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(payload)));
        }
        let record = normalize_from_mapping(&payload, OSM_ADDRESS_MAPPING);
        let record = enrich_generic(record, &METADATA, &payload, IMPORTANCE_KEY, None);
        Ok(Some(ResolvedOne::Record(Box::new(record))))
    }

    async fn get_address_by_reference(
        &self,
        _reference: &str,
        _options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        Err(ProviderError::unsupported(
            "Maps.co",
            "get_address_by_reference",
        ))
    }

    async fn get_address_by_osm(
        &self,
        query: &OsmQuery,
        options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        let key = self.api_key()?.to_string();
        let payload = match query {
            OsmQuery::Element { .. } => {
                let code = query.element_code().ok_or_else(|| ProviderError::InvalidInput {
                    reason: "osm_id and osm_type are required for element lookup".to_string(),
                })?;
                let params = [
                    ("api_key", key),
                    ("osm_ids", code),
                    ("format", "json".to_string()),
                    ("addressdetails", "1".to_string()),
                ];
                self.get("/lookup", &params).await?
            }
            OsmQuery::Tags(_) => {
                let tag_query = query.tag_query().ok_or_else(|| ProviderError::InvalidInput {
                    reason: "at least one OSM key=value pair is required".to_string(),
                })?;
                let params = [
                    ("api_key", key),
                    ("q", tag_query),
                    ("format", "json".to_string()),
                    ("addressdetails", "1".to_string()),
                    ("limit", "10".to_string()),
                ];
                self.get("/search", &params).await?
            }
        };
        Ok(self.collect(payload, options.raw, None))
    }
}
