//! Here geocoder v6.2. One `geocode.json` endpoint handles search,
//! reverse (`prox` mode) and LocationId lookup; results nest under
//! `Response.View[0].Result`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::normalize::{f64_at, nested_value, parse_proximity, str_at};
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_REFERENCE, OP_REVERSE, OP_SEARCH, OsmQuery,
    ProviderError, ProviderMetadata, Resolved, ResolvedOne, SearchOptions, Throttle,
    finalize_record, http_client,
};
use crate::schema::{AddressRecord, Field};

const METADATA: ProviderMetadata = ProviderMetadata {
    name: "here",
    display_name: "Here",
    description: "Here provider",
    documentation_url: "https://developer.here.com/documentation/geocoding-search-api",
    site_url: "https://developer.here.com",
    operations: &[OP_SEARCH, OP_REVERSE, OP_REFERENCE],
};

const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct Here {
    client: reqwest::Client,
    throttle: Throttle,
    base_url: String,
    app_id: Option<String>,
    app_code: Option<String>,
}

impl Here {
    pub fn new(config: &Config) -> Self {
        Self {
            client: http_client(config.http_timeout),
            throttle: Throttle::new(MIN_INTERVAL),
            base_url: config.here_base_url.clone(),
            app_id: config.here_app_id.clone(),
            app_code: config.here_app_code.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        match (self.app_id.as_deref(), self.app_code.as_deref()) {
            (Some(id), Some(code)) => Ok((id, code)),
            _ => Err(ProviderError::MissingConfig {
                key: "HERE_APP_ID and HERE_APP_CODE",
            }),
        }
    }

    async fn geocode(&self, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        self.throttle.wait().await;
        let payload = self
            .client
            .get(format!("{}/geocode.json", self.base_url))
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload)
    }

    fn normalize(&self, item: &Value, search_query: Option<&str>) -> AddressRecord {
        let mut record = extract_result(item);
        copy_display_position(item, &mut record);
        finalize_record(record, &METADATA, native_confidence(item), search_query)
    }
}

/// Pulls the result list out of `Response.View[0].Result`.
fn view_results(payload: &Value) -> Vec<Value> {
    nested_value(payload, "Response.View")
        .and_then(Value::as_array)
        .and_then(|views| views.first())
        .and_then(|view| view.get("Result"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// MatchQuality.Relevance scaled onto the canonical 0-1 range.
fn native_confidence(item: &Value) -> f64 {
    f64_at(item, "MatchQuality.Relevance").unwrap_or(0.0) / 100.0
}

fn extract_result(item: &Value) -> AddressRecord {
    let mut record = AddressRecord::new();

    let street = str_at(item, "Location.Address.Street");
    let house_number = str_at(item, "Location.Address.HouseNumber");
    let address_line1 = if !house_number.is_empty() && !street.is_empty() {
        format!("{house_number} {street}")
    } else {
        street.to_string()
    };
    record.insert_str(Field::AddressLine1, address_line1);
    record.insert_str(Field::AddressLine2, "");
    record.insert_str(Field::AddressLine3, "");

    record.insert_str(Field::City, str_at(item, "Location.Address.City"));
    record.insert_str(
        Field::PostalCode,
        str_at(item, "Location.Address.PostalCode"),
    );
    record.insert_str(Field::State, str_at(item, "Location.Address.State"));

    let county = str_at(item, "Location.Address.County");
    let region = if county.is_empty() {
        str_at(item, "Location.Address.Region")
    } else {
        county
    };
    record.insert_str(Field::Region, region);

    let country = str_at(item, "Location.Address.Country");
    record.insert_str(Field::Country, country);
    record.insert_str(Field::CountryCode, country.to_uppercase());

    let municipality = str_at(item, "Location.Address.Municipality");
    let district = str_at(item, "Location.Address.District");
    record.insert_str(
        Field::Municipality,
        if municipality.is_empty() {
            district
        } else {
            municipality
        },
    );

    let subdistrict = str_at(item, "Location.Address.Subdistrict");
    let neighborhood = str_at(item, "Location.Address.Neighborhood");
    record.insert_str(
        Field::Neighbourhood,
        if subdistrict.is_empty() {
            neighborhood
        } else {
            subdistrict
        },
    );
    record.insert_str(Field::AddressType, "");

    let location_id = str_at(item, "Location.LocationId");
    if !location_id.is_empty() {
        record.insert_str(Field::Reference, location_id);
    }

    record
}

fn copy_display_position(item: &Value, record: &mut AddressRecord) {
    if let Some(lat) = f64_at(item, "Location.DisplayPosition.Latitude") {
        record.insert_f64(Field::Latitude, lat);
    }
    if let Some(lon) = f64_at(item, "Location.DisplayPosition.Longitude") {
        record.insert_f64(Field::Longitude, lon);
    }
}

#[async_trait]
impl GeocodingProvider for Here {
    fn metadata(&self) -> &ProviderMetadata {
        &METADATA
    }

    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError> {
        let (app_id, app_code) = self.credentials()?;
        let mut params = vec![
            ("app_id", app_id.to_string()),
            ("app_code", app_code.to_string()),
            ("searchtext", query.to_string()),
            ("maxresults", options.limit.to_string()),
        ];
        if let Some(proximity) = options.proximity.as_deref()
            && let Some((lat, lon)) = parse_proximity(proximity)
        {
            params.push(("prox", format!("{lat},{lon},5000")));
        }

        let payload = self.geocode(&params).await?;
        let results = view_results(&payload);
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
        let (app_id, app_code) = self.credentials()?;
        let params = [
            ("app_id", app_id.to_string()),
            ("app_code", app_code.to_string()),
            ("prox", format!("{latitude},{longitude},250")),
            ("mode", "retrieveAddresses".to_string()),
            ("maxresults", "1".to_string()),
        ];
        let payload = self.geocode(&params).await?;
        if super::has_error_key(&payload) {
            return Ok(None);
        }
        let results = view_results(&payload);
        let Some(item) = results.first() else {
            return Ok(None);
        };
        if options.raw {
            return Ok(Some(ResolvedOne::Raw(item.clone())));
        }
        let mut record = extract_result(item);
        record.insert_f64(Field::Latitude, latitude);
        record.insert_f64(Field::Longitude, longitude);
        let record = finalize_record(record, &METADATA, native_confidence(item), None);
        Ok(Some(ResolvedOne::Record(Box::new(record))))
    }

    async fn get_address_by_reference(
        &self,
        reference: &str,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError> {
        let (app_id, app_code) = self.credentials()?;
        let params = [
            ("app_id", app_id.to_string()),
            ("app_code", app_code.to_string()),
            ("locationid", reference.to_string()),
        ];
        let payload = self.geocode(&params).await?;
        if super::has_error_key(&payload) {
            return Ok(None);
        }
        let results = view_results(&payload);
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
        Err(ProviderError::unsupported("Here", "get_address_by_osm"))
    }
}
