//! The provider contract shared by all ten backend adapters.
//!
//! A backend implements [`GeocodingProvider`]: four lookup operations
//! returning either normalized [`AddressRecord`]s or the vendor's raw
//! features, plus descriptive metadata. Shared plumbing lives here too:
//! the per-instance [`Throttle`], the HTTP client constructor, and the
//! enrichment step that stamps backend identity and scores onto freshly
//! normalized records.

pub mod error;
pub mod throttle;

pub use error::ProviderError;
pub use throttle::Throttle;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::normalize::{build_address_text, geoaddress_id};
use crate::scoring::{
    DEFAULT_IMPORTANCE_MULTIPLIER, QueryComponents, RelevanceWeights, confidence, relevance,
};
use crate::schema::{AddressRecord, Field};

/// Operation names, as reported in metadata and logs.
pub const OP_SEARCH: &str = "search_addresses";
pub const OP_REVERSE: &str = "reverse_geocode";
pub const OP_REFERENCE: &str = "get_address_by_reference";
pub const OP_OSM: &str = "get_address_by_osm";

/// Descriptive backend attributes, also searchable via `--attr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Machine name, e.g. `"nominatim"`.
    pub name: &'static str,
    /// Display name, e.g. `"Nominatim"`.
    pub display_name: &'static str,
    pub description: &'static str,
    pub documentation_url: &'static str,
    pub site_url: &'static str,
    /// Operations the vendor actually offers.
    pub operations: &'static [&'static str],
}

impl ProviderMetadata {
    /// Attribute value by name, for `--attr key=value` provider selection.
    pub fn attribute(&self, key: &str) -> Option<&'static str> {
        match key {
            "name" => Some(self.name),
            "display_name" => Some(self.display_name),
            "description" => Some(self.description),
            "documentation_url" => Some(self.documentation_url),
            "site_url" => Some(self.site_url),
            _ => None,
        }
    }

    pub fn supports(&self, operation: &str) -> bool {
        self.operations.contains(&operation)
    }
}

/// Options for forward search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Return the vendor's features untouched instead of normalizing.
    pub raw: bool,
    /// `"lat,lon"` bias hint; malformed values are ignored.
    pub proximity: Option<String>,
    /// Maximum results requested from the vendor.
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            raw: false,
            proximity: None,
            limit: crate::config::DEFAULT_RESULT_LIMIT,
        }
    }
}

/// Options for the single-result and OSM operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupOptions {
    /// Return the vendor's feature untouched instead of normalizing.
    pub raw: bool,
}

/// Outcome of a collection operation.
#[derive(Debug, Clone)]
pub enum Resolved {
    Records(Vec<AddressRecord>),
    Raw(Vec<Value>),
}

impl Resolved {
    pub fn is_empty(&self) -> bool {
        match self {
            Resolved::Records(records) => records.is_empty(),
            Resolved::Raw(features) => features.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Resolved::Records(records) => records.len(),
            Resolved::Raw(features) => features.len(),
        }
    }
}

/// Outcome of a single-result operation.
#[derive(Debug, Clone)]
pub enum ResolvedOne {
    Record(Box<AddressRecord>),
    Raw(Value),
}

/// An OSM lookup: either tag filters or one concrete element.
#[derive(Debug, Clone)]
pub enum OsmQuery {
    /// `key=value` tag pairs, e.g. `place=city`, `name=Paris`.
    Tags(BTreeMap<String, String>),
    /// A single element by id and type letter (`N`/`W`/`R`).
    Element { osm_id: i64, osm_type: String },
}

impl OsmQuery {
    /// Serializes tag pairs to the `[key=value]...` special-phrase query
    /// understood by Nominatim-family endpoints. `None` when no usable
    /// pair exists or this is an element lookup.
    pub fn tag_query(&self) -> Option<String> {
        match self {
            OsmQuery::Tags(tags) => {
                let joined: String = tags
                    .iter()
                    .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                    .map(|(k, v)| format!("[{k}={v}]"))
                    .collect();
                (!joined.is_empty()).then_some(joined)
            }
            OsmQuery::Element { .. } => None,
        }
    }

    /// `"{type_letter}{id}"` for element lookups, e.g. `"N9550582112"`.
    pub fn element_code(&self) -> Option<String> {
        match self {
            OsmQuery::Tags(_) => None,
            OsmQuery::Element { osm_id, osm_type } => {
                let letter = osm_type.trim().to_uppercase();
                (!letter.is_empty()).then(|| format!("{letter}{osm_id}"))
            }
        }
    }
}

/// One vendor-specific geocoding backend.
///
/// Implementations validate credentials before any network call, pace
/// requests through their own [`Throttle`], and construct every record
/// fresh per raw result item. Operations a vendor cannot offer return
/// [`ProviderError::Unsupported`] without attempting a request.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    fn metadata(&self) -> &ProviderMetadata;

    /// Forward search: free-text query to candidate addresses.
    async fn search_addresses(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved, ProviderError>;

    /// Coordinates to the closest address.
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError>;

    /// Lookup by the vendor's stable identifier.
    async fn get_address_by_reference(
        &self,
        reference: &str,
        options: &LookupOptions,
    ) -> Result<Option<ResolvedOne>, ProviderError>;

    /// Lookup by OSM tags or element id.
    async fn get_address_by_osm(
        &self,
        query: &OsmQuery,
        options: &LookupOptions,
    ) -> Result<Resolved, ProviderError>;
}

/// Builds the blocking-free HTTP client every adapter holds: fixed request
/// timeout, no retries.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Stamps backend identity, display text, a precomputed confidence, the
/// optional search relevance and the cross-backend id onto a normalized
/// record. Catalog ordering is inherent to [`AddressRecord`].
pub(crate) fn finalize_record(
    mut record: AddressRecord,
    meta: &ProviderMetadata,
    record_confidence: f64,
    search_query: Option<&str>,
) -> AddressRecord {
    record.insert_str(Field::Backend, meta.display_name);
    record.insert_str(Field::BackendName, meta.name);
    record.insert_str(Field::Text, build_address_text(&record));
    record.insert_f64(Field::Confidence, record_confidence);
    if let Some(query) = search_query {
        let score = relevance(
            &QueryComponents::from_query(query),
            &record,
            None,
            None,
            &RelevanceWeights::default(),
            true,
        );
        record.insert_f64(Field::Relevance, score);
    }
    if let Some(id) = geoaddress_id(&record) {
        record.insert_str(Field::GeoaddressId, id);
    }
    record
}

/// The common enrichment path: generic importance-derived confidence, then
/// [`finalize_record`]. Adapters with a native quality signal compute their
/// confidence themselves and call [`finalize_record`] directly.
pub(crate) fn enrich_generic(
    record: AddressRecord,
    meta: &ProviderMetadata,
    feature: &Value,
    importance_key: &str,
    search_query: Option<&str>,
) -> AddressRecord {
    let record_confidence = confidence(
        &record,
        Some(feature),
        Some(importance_key),
        DEFAULT_IMPORTANCE_MULTIPLIER,
    );
    finalize_record(record, meta, record_confidence, search_query)
}
