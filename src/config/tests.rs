use super::*;
use serial_test::serial;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

#[test]
#[serial]
fn default_config() {
    let config = Config::default();

    assert_eq!(config.http_timeout, Duration::from_secs(10));
    assert_eq!(config.result_limit, 10);
    assert_eq!(config.nominatim_base_url, "https://nominatim.openstreetmap.org");
    assert_eq!(config.nominatim_user_agent, DEFAULT_USER_AGENT);
    assert!(config.locationiq_api_key.is_none());
    assert!(config.google_api_key.is_none());
    assert!(config.here_app_id.is_none());
}

#[test]
#[serial]
fn from_env_reads_overrides() {
    let config = with_env_vars(
        &[
            ("GEOAPIFY_API_KEY", "test-key"),
            ("NOMINATIM_BASE_URL", "http://localhost:8088"),
            ("GEOADDRESS_HTTP_TIMEOUT_SECS", "3"),
            ("GEOADDRESS_RESULT_LIMIT", "5"),
        ],
        || Config::from_env().unwrap(),
    );

    assert_eq!(config.geoapify_api_key.as_deref(), Some("test-key"));
    assert_eq!(config.nominatim_base_url, "http://localhost:8088");
    assert_eq!(config.http_timeout, Duration::from_secs(3));
    assert_eq!(config.result_limit, 5);
}

#[test]
#[serial]
fn empty_and_whitespace_credentials_count_as_unset() {
    let config = with_env_vars(
        &[("MAPBOX_ACCESS_TOKEN", ""), ("OPENCAGE_API_KEY", "   ")],
        || Config::from_env().unwrap(),
    );
    assert!(config.mapbox_access_token.is_none());
    assert!(config.opencage_api_key.is_none());
}

#[test]
#[serial]
fn credentials_are_trimmed() {
    let config = with_env_vars(&[("GEOCODE_EARTH_API_KEY", "  key-123  ")], || {
        Config::from_env().unwrap()
    });
    assert_eq!(config.geocode_earth_api_key.as_deref(), Some("key-123"));
}

#[test]
#[serial]
fn invalid_timeout_is_an_error() {
    let result = with_env_vars(&[("GEOADDRESS_HTTP_TIMEOUT_SECS", "abc")], Config::from_env);
    assert!(matches!(result, Err(ConfigError::InvalidNumber { .. })));

    let result = with_env_vars(&[("GEOADDRESS_HTTP_TIMEOUT_SECS", "0")], Config::from_env);
    assert!(matches!(result, Err(ConfigError::OutOfRange { .. })));
}
