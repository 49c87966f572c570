//! The dispatch facade.
//!
//! [`ProviderRegistry`] owns one instance of every backend and answers
//! selection queries (by name, name substring, or metadata attribute).
//! [`ProviderRegistry::try_providers`] fans a single operation out across
//! the selected backends and renders every outcome into plain JSON under
//! the degradation policy: adapter errors never escape, they become empty
//! results, or `{"error": ...}` markers when raw output was requested.


use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::Config;
use crate::provider::{
    GeocodingProvider, LookupOptions, OP_OSM, OP_REFERENCE, OP_REVERSE, OP_SEARCH, OsmQuery,
    ProviderError, Resolved, ResolvedOne, SearchOptions,
};
use crate::providers::{
    Geoapify, GeocodeEarth, Google, Here, LocationIq, Mapbox, MapsCo, Nominatim, OpenCage, Photon,
};

/// One of the four operations, ready to run against any backend.
#[derive(Debug, Clone)]
pub enum ProviderCall {
    Search {
        query: String,
        options: SearchOptions,
    },
    Reverse {
        latitude: f64,
        longitude: f64,
        options: LookupOptions,
    },
    Reference {
        reference: String,
        options: LookupOptions,
    },
    Osm {
        query: OsmQuery,
        options: LookupOptions,
    },
}

impl ProviderCall {
    fn raw(&self) -> bool {
        match self {
            ProviderCall::Search { options, .. } => options.raw,
            ProviderCall::Reverse { options, .. }
            | ProviderCall::Reference { options, .. }
            | ProviderCall::Osm { options, .. } => options.raw,
        }
    }

    /// Collection operations render as arrays, single-result ones as an
    /// object or null.
    fn is_collection(&self) -> bool {
        matches!(self, ProviderCall::Search { .. } | ProviderCall::Osm { .. })
    }

    fn operation(&self) -> &'static str {
        match self {
            ProviderCall::Search { .. } => OP_SEARCH,
            ProviderCall::Reverse { .. } => OP_REVERSE,
            ProviderCall::Reference { .. } => OP_REFERENCE,
            ProviderCall::Osm { .. } => OP_OSM,
        }
    }
}

/// How `try_providers` picks its backends.
#[derive(Debug, Clone, Default)]
pub struct ProviderFilter {
    /// Case-insensitive substring over backend machine names.
    pub name_contains: Option<String>,
    /// Metadata attribute equality, all pairs must match.
    pub attributes: BTreeMap<String, String>,
}

impl ProviderFilter {
    fn matches(&self, provider: &dyn GeocodingProvider) -> bool {
        let meta = provider.metadata();
        if let Some(fragment) = self.name_contains.as_deref()
            && !meta.name.contains(&fragment.to_lowercase())
        {
            return false;
        }
        self.attributes
            .iter()
            .all(|(key, value)| meta.attribute(key) == Some(value.as_str()))
    }
}

/// All ten backends, in stable registration order.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn GeocodingProvider>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            providers: vec![
                Box::new(Nominatim::new(config)),
                Box::new(Photon::new(config)),
                Box::new(LocationIq::new(config)),
                Box::new(OpenCage::new(config)),
                Box::new(GeocodeEarth::new(config)),
                Box::new(Geoapify::new(config)),
                Box::new(MapsCo::new(config)),
                Box::new(Google::new(config)),
                Box::new(Mapbox::new(config)),
                Box::new(Here::new(config)),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.metadata().name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn GeocodingProvider> {
        self.providers
            .iter()
            .map(Box::as_ref)
            .find(|p| p.metadata().name == name)
    }

    pub fn select(&self, filter: &ProviderFilter) -> Vec<&dyn GeocodingProvider> {
        self.providers
            .iter()
            .map(Box::as_ref)
            .filter(|p| filter.matches(*p))
            .collect()
    }

    /// Runs `call` against every selected backend and maps each backend
    /// name to its rendered outcome.
    pub async fn try_providers(
        &self,
        filter: &ProviderFilter,
        call: &ProviderCall,
    ) -> BTreeMap<String, Value> {
        let mut outcomes = BTreeMap::new();
        for provider in self.select(filter) {
            let name = provider.metadata().name;
            debug!(provider = name, operation = call.operation(), "dispatching");
            let outcome = invoke(provider, call).await;
            outcomes.insert(name.to_string(), render(outcome, call, name));
        }
        outcomes
    }

    /// Like [`try_providers`](Self::try_providers), but stops at the first
    /// backend returning a non-empty, non-error outcome.
    pub async fn try_providers_first(
        &self,
        filter: &ProviderFilter,
        call: &ProviderCall,
    ) -> Option<(String, Value)> {
        for provider in self.select(filter) {
            let name = provider.metadata().name;
            debug!(provider = name, operation = call.operation(), "dispatching");
            match invoke(provider, call).await {
                Ok(value) if !outcome_is_empty(&value) => {
                    return Some((name.to_string(), value));
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(provider = name, %error, "provider failed, trying next");
                }
            }
        }
        None
    }
}

async fn invoke(
    provider: &dyn GeocodingProvider,
    call: &ProviderCall,
) -> Result<Value, ProviderError> {
    match call {
        ProviderCall::Search { query, options } => {
            let resolved = provider.search_addresses(query, options).await?;
            Ok(resolved_to_value(resolved))
        }
        ProviderCall::Reverse {
            latitude,
            longitude,
            options,
        } => {
            let resolved = provider.reverse_geocode(*latitude, *longitude, options).await?;
            Ok(resolved_one_to_value(resolved))
        }
        ProviderCall::Reference { reference, options } => {
            let resolved = provider.get_address_by_reference(reference, options).await?;
            Ok(resolved_one_to_value(resolved))
        }
        ProviderCall::Osm { query, options } => {
            let resolved = provider.get_address_by_osm(query, options).await?;
            Ok(resolved_to_value(resolved))
        }
    }
}

fn resolved_to_value(resolved: Resolved) -> Value {
    match resolved {
        Resolved::Records(records) => {
            Value::Array(records.iter().map(|r| r.to_value()).collect())
        }
        Resolved::Raw(features) => Value::Array(features),
    }
}

fn resolved_one_to_value(resolved: Option<ResolvedOne>) -> Value {
    match resolved {
        Some(ResolvedOne::Record(record)) => record.to_value(),
        Some(ResolvedOne::Raw(feature)) => feature,
        None => Value::Null,
    }
}

/// The degradation policy. Errors are swallowed into the outcome shape the
/// caller asked for; the message survives only in raw mode.
fn render(outcome: Result<Value, ProviderError>, call: &ProviderCall, name: &str) -> Value {
    match outcome {
        Ok(value) => value,
        Err(error) => {
            warn!(provider = name, operation = call.operation(), %error, "provider failed");
            match (call.is_collection(), call.raw()) {
                (true, true) => json!([{"error": error.to_string()}]),
                (true, false) => json!([]),
                (false, true) => json!({"error": error.to_string()}),
                (false, false) => Value::Null,
            }
        }
    }
}

fn outcome_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
