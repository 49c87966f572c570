//! Google Maps geocoding. Components arrive as a typed list rather than a
//! flat object, and match precision is a discrete `location_type` enum
//! instead of a continuous importance signal.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::normalize::{f64_at, str_at};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_REFERENCE, OP_REVERSE, OP_SEARCH, OsmQuery,
    ProviderError, ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle,
    finalize_record, http_client,
};
use crate::scoring::confidence_heuristic;
use crate::schema::{AddressRecord, Field};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "google",
    display_name: "Google Maps",
    description: "Google Maps provider",
    documentation_url: "https://developers.google.com/maps/documentation/geocoding",
    site_url: "https://maps.google.com",
    operations: &[OP_SEARCH, OP_REVERSE, OP_REFERENCE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct Google {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    api_key: Option<String>,
}

impl Google {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.google_base_url.clone(),
            api_key: config.google_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "GOOGLE_API_KEY",
            })
    }

    async fn geocode(&self, params: &[(&str, String)]) -> Result<Vec<Value>, ProviderError> {
        self.throttle.wait().await;
        let payload: Value = self
            .client
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match payload.get("status").and_then(Value::as_str) {
            Some("OK") | Some("ZERO_RESULTS") => {}
            Some(status) => {
                return Err(ProviderError::malformed(format!(
                    "geocode status {status}"
                )));
            }
            None => return Err(ProviderError::malformed("response carries no status")),
        }

        Ok(payload
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    fn normalize(&self, item: &Value, search_query: Option<&str>) -> AddressRecord {
        let record = extract_result(item);
        let record_confidence =
            location_type_confidence(item).unwrap_or_else(|| confidence_heuristic(&record));
        finalize_record(record, &METADATA, record_confidence, search_query)
    }
}

/// Confidence from the discrete `geometry.location_type` enum. Unknown
/// values fall back to the structural heuristic.
fn location_type_confidence(item: &Value) -> Option<f64> {
    match str_at(item, "geometry.location_type") {
        "ROOFTOP" => Some(0.95),
        "RANGE_INTERPOLATED" => Some(0.8),
        "GEOMETRIC_CENTER" => Some(0.6),
        "APPROXIMATE" => Some(0.4),
        _ => None,
    }
}

/// First component carrying `wanted` in its `types`, as (long_name,
/// short_name).
fn component<'a>(item: &'a Value, wanted: &str) -> Option<(&'a str, &'a str)> {
    let components = item.get("address_components")?.as_array()?;
    components
        .iter()
        .find(|c| {
            c.get("types")
                .and_then(Value::as_array)
                .is_some_and(|types| types.iter().any(|t| t.as_str() == Some(wanted)))
        })
        .map(|c| (str_at(c, "long_name"), str_at(c, "short_name")))
}

fn component_long<'a>(item: &'a Value, kinds: &[&str]) -> &'a str {
    kinds
        .iter()
        .filter_map(|kind| component(item, kind))
        .map(|(long_name, _)| long_name)
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

fn extract_result(item: &Value) -> AddressRecord {
    let mut record = AddressRecord::new();

    let street_number = component_long(item, &["street_number"]);
    let route = component_long(item, &["route"]);
    let mut address_line1 = [street_number, route]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if address_line1.is_empty() {
        address_line1 = str_at(item, "formatted_address")
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
    }
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    record.insert_str(Field::City, component_long(item, &["locality", "postal_town"]));
    record.insert_str(Field::PostalCode, component_long(item, &["postal_code"]));
    record.insert_str(
        Field::State,
        component_long(item, &["administrative_area_level_1"]),
    );
    record.insert_str(
        Field::Region,
        component_long(item, &["administrative_area_level_2"]),
    );
    if let Some((country, country_code)) = component(item, "country") {
        record.insert_str(Field::Country, country);
        record.insert_str(Field::CountryCode, country_code.to_uppercase());
    } else {
        record.insert_str(Field::Country, "");
        record.insert_str(Field::CountryCode, "");
    }
    record.insert_str(
        Field::Municipality,
        component_long(item, &["administrative_area_level_3"]),
    );
    record.insert_str(
        Field::Neighbourhood,
        component_long(item, &["neighborhood", "sublocality"]),
    );

    let address_type = item
        .get("types")
        .and_then(Value::as_array)
        .and_then(|types| types.first())
        .and_then(Value::as_str)
        .unwrap_or("");
    record.insert_str(Field::AddressType, address_type);

    let place_id = str_at(item, "place_id");
    if !place_id.is_empty() {
        record.insert_str(Field::Reference, place_id);
    }

    if let Some(lat) = f64_at(item, "geometry.location.lat") {
        record.insert_f64(Field::Latitude, lat);
    }
    if let Some(lon) = f64_at(item, "geometry.location.lng") {
        record.insert_f64(Field::Longitude, lon);
    }

    record
}

#[async_trait]
impl GeocodingProvider for Google {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("address", query.to_string()),
        ];
        let results = self.geocode(&params).await?;
        // The geocode endpoint has no limit parameter; trim client-side.
        let results: Vec<Value> = results.into_iter().take(options.limit).collect();
        if options.raw {
            return Ok(Resolved::Raw(results));
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
            ("latlng", format!("{latitude},{longitude}")),
        ];
        let results = self.geocode(&params).await?;
        let Some(item) = results.first() else {
            return Ok(None);
        };
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(item.clone())));
        }
        Ok(Some(ResolvedOne::Record(Box::new(
            self.normalize(item, None),
        ))))
    }

    async fn get_address_by_reference(
        &self,
        reference: &str,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("place_id", reference.to_string()),
        ];
        let results = self.geocode(&params).await?;
        let Some(item) = results.first() else {
            return Ok(None);
        };
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(item.clone())));
        }
        Ok(Some(ResolvedOne::Record(Box::new(
            self.normalize(item, None),
        ))))
    }

    async fn get_address_by_osm(
        &self,
        _query: &OsmQuery,
        _options: &LookupOptions,
    ) -> Result<Resolved, ProviderError> {
        Err(ProviderError::unsupported(
            "Google Maps",
            "get_address_by_osm",
        ))
    }
}
