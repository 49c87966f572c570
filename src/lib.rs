//! Geoaddress library crate (used by the CLI binary and integration tests).
//!
//! A uniform facade over ten third-party geocoding HTTP APIs. Four
//! operations (forward search, reverse geocoding, lookup by provider
//! reference, lookup by OSM tag or element) run against any subset of the
//! backends, and every result is normalized into one canonical,
//! schema-ordered address record with comparable confidence and relevance
//! scores.
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Environment-backed configuration
//! - [`Field`], [`AddressRecord`] - Canonical address schema
//! - [`ProviderRegistry`], [`ProviderCall`], [`ProviderFilter`] - Dispatch
//!   facade
//!
//! ## Provider Contract
//! - [`GeocodingProvider`], [`ProviderMetadata`], [`ProviderError`]
//! - [`SearchOptions`], [`LookupOptions`], [`OsmQuery`]
//! - [`Resolved`], [`ResolvedOne`] - Normalized-or-raw operation outcomes
//!
//! ## Scoring
//! - [`scoring::confidence`], [`scoring::relevance`] - The shared scoring
//!   engine making vendor results comparable

pub mod config;
pub mod geo;
pub mod normalize;
pub mod provider;
pub mod providers;
pub mod schema;
pub mod scoring;
pub mod service;

pub use config::{Config, ConfigError};
pub use provider::{
    GeocodingProvider, LookupOptions, OsmQuery, ProviderError, ProviderMetadata, Resolved,
    ResolvedOne, SearchOptions,
};
pub use schema::{AddressRecord, Field};
pub use service::{ProviderCall, ProviderFilter, ProviderRegistry};
