//! Nominatim, the OpenStreetMap reference geocoder.
//!
//! The public instance enforces an absolute maximum of one request per
//! second and requires an identifying User-Agent, so this adapter ships
//! with a 1 s throttle and always sends one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::Value;

use super::OSM_ADDRESS_MAPPING;
use crate::config::Config;
use crate::normalize::{normalize_from_mapping, parse_proximity};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_OSM, OP_REFERENCE, OP_REVERSE, OP_SEARCH, OsmQuery,
    ProviderError, ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle,
    enrich_generic, http_client,
};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "nominatim",
    display_name: "Nominatim",
    description: "Nominatim provider",
    documentation_url: "https://nominatim.org/release-docs/develop/api/Overview/",
    site_url: "https://nominatim.org",
    operations: &[OP_SEARCH, OP_REVERSE, OP_REFERENCE, OP_OSM],
};

const MIN_INTERVAL: Duration = Duration::from_secs(1);
const IMPORTANCE_KEY: &str = "importance";

pub struct Nominatim {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    user_agent: String,
}

impl Nominatim {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.nominatim_base_url.clone(),
            user_agent: config.nominatim_user_agent.clone(),
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

    fn collect(&self, items: &[Value], search_query: Option<&str>) -> Resolved {
        let records = items
            .iter()
            .map(|feature| {
                let record = normalize_from_mapping(feature, OSM_ADDRESS_MAPPING);
                enrich_generic(record, &METADATA, feature, IMPORTANCE_KEY, search_query)
            })
            .collect();
        Resolved::Records(records)
    }
}

#[async_trait]
impl GeocodingProvider for Nominatim {
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
        let Some(items) = payload.as_array() else {
            return Err(ProviderError::malformed("search response is not an array"));
        };
        if options.raw {
            return Ok(Resolved::Raw(items.clone()));
        }
        Ok(self.collect(items, Some(query)))
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
        reference: &str,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [
            ("place_id", reference.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        let payload = self.get("/details", &params).await?;
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

    async fn get_address_by_osm(
        &self,
        query: &OsmQuery,
        options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        let payload = match query {
            OsmQuery::Element { .. } => {
                let code = query.element_code().ok_or_else(|| ProviderError::InvalidInput {
                    reason: "osm_id and osm_type are required for element lookup".to_string(),
                })?;
                let params = [
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
                    ("q", tag_query),
                    ("format", "json".to_string()),
                    ("addressdetails", "1".to_string()),
                    ("limit", "10".to_string()),
                ];
                self.get("/search", &params).await?
            }
        };

        let Some(items) = payload.as_array() else {
            return Err(ProviderError::malformed("lookup response is not an array"));
        };
        if options.raw {
            return Ok(Resolved::Raw(items.clone()));
        }
        Ok(self.collect(items, None))
    }
}
