//! LocationIQ, a hosted Nominatim with its own key and pacing rules.

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
    name: "locationiq",
    display_name: "LocationIQ",
    description: "LocationIQ provider",
    documentation_url: "https://docs.locationiq.com/",
    site_url: "https://locationiq.com",
    operations: &[OP_SEARCH, OP_REVERSE, OP_OSM],
};

const MIN_INTERVAL: Duration = Duration::from_millis(500);
const IMPORTANCE_KEY: &str = "importance";

pub struct LocationIq {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    api_key: Option<String>,
}

impl LocationIq {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.locationiq_base_url.clone(),
            api_key: config.locationiq_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "LOCATIONIQ_API_KEY",
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

    async fn search(
        &self,
        query: String,
        proximity: Option<&str>,
        limit: usize,
        raw: bool,
        relevance_query: Option<&str>,
    ) -> Result<Resolved, ProviderError> {
        let mut params = vec![
            ("key", self.api_key()?.to_string()),
            ("q", query),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(proximity) = proximity
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("lat", lat.to_string()));
            params.push(("lon", lon.to_string()));
        }

        let payload = self.get("/search.php", &params).await?;
        // A single object is a one-element result set unless it carries
        // an inline error.
        let items: Vec<Value> = match payload {
            Value::Array(items) => items,
            Value::Object(_) if super::has_error_key(&payload) => Vec::new(),
            Value::Object(_) => vec![payload],
            _ => Vec::new(),
        };
        if raw {
            return Ok(Resolved::Raw(items));
        }
        let records = items
            .iter()
            .map(|feature| {
                let record = normalize_from_mapping(feature, OSM_ADDRESS_MAPPING);
                enrich_generic(record, &METADATA, feature, IMPORTANCE_KEY, relevance_query)
            })
            .collect();
        Ok(Resolved::Records(records))
    }
}

#[async_trait]
impl GeocodingProvider for LocationIq {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        self.search(
            query.to_string(),
            options.proximity.as_deref(),
            options.limit,
            options.raw,
            Some(query),
        )
        .await
    }

    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        let payload = self.get("/reverse.php", &params).await?;
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(payload)));
        }
        if !payload.is_object() || super::has_error_key(&payload) {
            return Ok(None);
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
        Err(ProviderError::Unsupported {
            message: "LocationIQ does not support direct lookup by reference ID. \
                      Use reverse_geocode with coordinates instead."
                .to_string(),
        })
    }

    async fn get_address_by_osm(
        &self,
        query: &OsmQuery,
        options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        // No dedicated element endpoint; element lookups go through the
        // same special-phrase search as tag lookups.
        let tag_query = match query {
            OsmQuery::Tags(_) => query.tag_query(),
            OsmQuery::Element { osm_id, osm_type } => query
                .element_code()
                .map(|_| format!("[osm_id={osm_id}][osm_type={osm_type}]")),
        }
        .ok_or_else(|| ProviderError::InvalidInput {
            reason: "at least one OSM key=value pair is required".to_string(),
        })?;

        self.search(tag_query, None, 10, options.raw, None).await
    }
}
