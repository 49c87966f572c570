//! Geocode Earth, a hosted Pelias. Forward search rides the autocomplete
//! endpoint; stable Pelias GIDs back the reference lookup.

use std::time::Duration;

use async_trait::async_trait;
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
    name: "geocode_earth",
    display_name: "Geocode Earth",
    description: "Geocode Earth provider",
    documentation_url: "https://geocode.earth/docs",
    site_url: "https://geocode.earth",
    operations: &[OP_SEARCH, OP_REVERSE, OP_REFERENCE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(500);
const IMPORTANCE_KEY: &str = "properties.confidence";

pub struct GeocodeEarth {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    api_key: Option<String>,
}

impl GeocodeEarth {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.geocode_earth_base_url.clone(),
            api_key: config.geocode_earth_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingConfig {
                key: "GEOCODE_EARTH_API_KEY",
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
        let mut record = extract_feature(feature);
        copy_point_coordinates(feature, &mut record);
        enrich_generic(record, &METADATA, feature, IMPORTANCE_KEY, search_query)
    }
}

fn extract_feature(feature: &Value) -> AddressRecord {
    let mut record = AddressRecord::new();

    let house_number = str_at(feature, "properties.housenumber");
    let street = str_at(feature, "properties.street");
    let mut address_line1 = [house_number, street]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if address_line1.is_empty() {
        // Venue and locality features carry their label in "name".
        address_line1 = str_at(feature, "properties.name").to_string();
    }
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    let city = first_of(
        feature,
        &[
            "properties.locality",
            "properties.localadmin",
            "properties.county",
        ],
    );
    record.insert_str(Field::City, city);
    record.insert_str(Field::PostalCode, str_at(feature, "properties.postalcode"));
    record.insert_str(Field::State, str_at(feature, "properties.state"));
    record.insert_str(Field::Region, str_at(feature, "properties.region"));
    record.insert_str(Field::Country, str_at(feature, "properties.country"));
    record.insert_str(
        Field::CountryCode,
        str_at(feature, "properties.country_a").to_uppercase(),
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
            ],
        ),
    );

    let address_type = first_of(feature, &["properties.layer", "properties.type"]);
    record.insert_str(Field::AddressType, address_type);

    let gid = str_at(feature, "properties.gid");
    let reference = if gid.is_empty() {
        str_at(feature, "id")
    } else {
        gid
    };
    if !reference.is_empty() {
        record.insert_str(Field::Reference, reference);
    }

    record
}

fn copy_point_coordinates(feature: &Value, record: &mut AddressRecord) {
    if let Some(coords) = nested_value(feature, "geometry.coordinates").and_then(Value::as_array)
        && coords.len() >= 2
        && let (Some(lon), Some(lat)) = (coords[0].as_f64(), coords[1].as_f64())
    {
        record.insert_f64(Field::Latitude, lat);
        record.insert_f64(Field::Longitude, lon);
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
impl GeocodingProvider for GeocodeEarth {
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
            ("text", query.to_string()),
            ("size", options.limit.to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("focus.point.lat", lat.to_string()));
            params.push(("focus.point.lon", lon.to_string()));
        }

        let payload = self.get("/autocomplete", &params).await?;
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
            ("api_key", self.api_key()?.to_string()),
            ("point.lat", latitude.to_string()),
            ("point.lon", longitude.to_string()),
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
            ("api_key", self.api_key()?.to_string()),
            ("ids", reference.to_string()),
        ];
        let payload = self.get("/place", &params).await?;
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
        Err(ProviderError::unsupported(
            "Geocode Earth",
            "get_address_by_osm",
        ))
    }
}
