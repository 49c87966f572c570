//! Environment-backed configuration.
//!
//! Base URLs and user agents have defaults; API credentials do not. An
//! adapter whose credential is absent stays constructible but reports a
//! configuration error instead of issuing requests.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::time::Duration;

/// Default User-Agent sent to vendors that require one (Nominatim policy).
pub const DEFAULT_USER_AGENT: &str = "rust-geoaddress/0.1";

/// Fixed per-request socket timeout; the core attempts no retries.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum number of results requested from search endpoints.
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Provider credentials and endpoints, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-request socket timeout. Default: 10 s.
    pub http_timeout: Duration,

    /// Result limit passed to search endpoints. Default: `10`.
    pub result_limit: usize,

    pub nominatim_base_url: String,
    pub nominatim_user_agent: String,

    pub photon_base_url: String,
    pub photon_user_agent: String,

    pub locationiq_base_url: String,
    pub locationiq_api_key: Option<String>,

    pub opencage_base_url: String,
    pub opencage_api_key: Option<String>,

    pub geocode_earth_base_url: String,
    pub geocode_earth_api_key: Option<String>,

    pub geoapify_base_url: String,
    pub geoapify_api_key: Option<String>,

    pub maps_co_base_url: String,
    pub maps_co_api_key: Option<String>,

    pub google_base_url: String,
    pub google_api_key: Option<String>,

    pub mapbox_base_url: String,
    pub mapbox_access_token: Option<String>,

    pub here_base_url: String,
    pub here_app_id: Option<String>,
    pub here_app_code: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            result_limit: DEFAULT_RESULT_LIMIT,
            nominatim_base_url: "https://nominatim.openstreetmap.org".to_string(),
            nominatim_user_agent: DEFAULT_USER_AGENT.to_string(),
            photon_base_url: "https://photon.komoot.io".to_string(),
            photon_user_agent: DEFAULT_USER_AGENT.to_string(),
            locationiq_base_url: "https://api.locationiq.com/v1".to_string(),
            locationiq_api_key: None,
            opencage_base_url: "https://api.opencagedata.com/geocode/v1".to_string(),
            opencage_api_key: None,
            geocode_earth_base_url: "https://api.geocode.earth/v1".to_string(),
            geocode_earth_api_key: None,
            geoapify_base_url: "https://api.geoapify.com/v1".to_string(),
            geoapify_api_key: None,
            maps_co_base_url: "https://geocode.maps.co".to_string(),
            maps_co_api_key: None,
            google_base_url: "https://maps.googleapis.com".to_string(),
            google_api_key: None,
            mapbox_base_url: "https://api.mapbox.com".to_string(),
            mapbox_access_token: None,
            here_base_url: "https://geocoder.api.here.com/6.2".to_string(),
            here_app_id: None,
            here_app_code: None,
        }
    }
}

impl Config {
    const ENV_HTTP_TIMEOUT_SECS: &'static str = "GEOADDRESS_HTTP_TIMEOUT_SECS";
    const ENV_RESULT_LIMIT: &'static str = "GEOADDRESS_RESULT_LIMIT";

    /// Loads configuration from environment variables (falling back to
    /// defaults; empty variables count as unset).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let http_timeout = match Self::parse_u64_from_env(Self::ENV_HTTP_TIMEOUT_SECS)? {
            Some(0) => {
                return Err(ConfigError::OutOfRange {
                    name: Self::ENV_HTTP_TIMEOUT_SECS,
                    value: "0".to_string(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.http_timeout,
        };

        let result_limit = match Self::parse_u64_from_env(Self::ENV_RESULT_LIMIT)? {
            Some(0) => {
                return Err(ConfigError::OutOfRange {
                    name: Self::ENV_RESULT_LIMIT,
                    value: "0".to_string(),
                });
            }
            Some(limit) => limit as usize,
            None => defaults.result_limit,
        };

        Ok(Self {
            http_timeout,
            result_limit,
            nominatim_base_url: Self::string_from_env(
                "NOMINATIM_BASE_URL",
                defaults.nominatim_base_url,
            ),
            nominatim_user_agent: Self::string_from_env(
                "NOMINATIM_USER_AGENT",
                defaults.nominatim_user_agent,
            ),
            photon_base_url: Self::string_from_env("PHOTON_BASE_URL", defaults.photon_base_url),
            photon_user_agent: Self::string_from_env(
                "PHOTON_USER_AGENT",
                defaults.photon_user_agent,
            ),
            locationiq_base_url: Self::string_from_env(
                "LOCATIONIQ_BASE_URL",
                defaults.locationiq_base_url,
            ),
            locationiq_api_key: Self::optional_from_env("LOCATIONIQ_API_KEY"),
            opencage_base_url: Self::string_from_env(
                "OPENCAGE_BASE_URL",
                defaults.opencage_base_url,
            ),
            opencage_api_key: Self::optional_from_env("OPENCAGE_API_KEY"),
            geocode_earth_base_url: Self::string_from_env(
                "GEOCODE_EARTH_BASE_URL",
                defaults.geocode_earth_base_url,
            ),
            geocode_earth_api_key: Self::optional_from_env("GEOCODE_EARTH_API_KEY"),
            geoapify_base_url: Self::string_from_env(
                "GEOAPIFY_BASE_URL",
                defaults.geoapify_base_url,
            ),
            geoapify_api_key: Self::optional_from_env("GEOAPIFY_API_KEY"),
            maps_co_base_url: Self::string_from_env("MAPS_CO_BASE_URL", defaults.maps_co_base_url),
            maps_co_api_key: Self::optional_from_env("MAPS_CO_API_KEY"),
            google_base_url: Self::string_from_env("GOOGLE_BASE_URL", defaults.google_base_url),
            google_api_key: Self::optional_from_env("GOOGLE_API_KEY"),
            mapbox_base_url: Self::string_from_env("MAPBOX_BASE_URL", defaults.mapbox_base_url),
            mapbox_access_token: Self::optional_from_env("MAPBOX_ACCESS_TOKEN"),
            here_base_url: Self::string_from_env("HERE_BASE_URL", defaults.here_base_url),
            here_app_id: Self::optional_from_env("HERE_APP_ID"),
            here_app_code: Self::optional_from_env("HERE_APP_CODE"),
        })
    }

    fn string_from_env(var_name: &str, default: String) -> String {
        Self::optional_from_env(var_name).unwrap_or(default)
    }

    fn optional_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str) -> Result<Option<u64>, ConfigError> {
        match env::var(var_name) {
            Ok(value) => {
                let parsed = value.parse().map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value: value.clone(),
                    source: e,
                })?;
                Ok(Some(parsed))
            }
            Err(_) => Ok(None),
        }
    }
}
