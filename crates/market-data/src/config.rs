//! Client configuration.
//!
//! All fields have defaults, so an empty document (or `ClientConfig::default()`)
//! is a usable configuration. [`ClientConfig::from_env`] overlays `NSE_*`
//! environment variables on top of the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Default per-attempt request timeout.
const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Default number of refresh-and-retry cycles on an anti-bot rejection.
const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default lifetime of a session before it is proactively refreshed.
const DEFAULT_SESSION_TTL_SECS: u64 = 240;

/// Longest accepted session lifetime. Upstream cookies last minutes, not days.
const MAX_SESSION_TTL_SECS: u64 = 86_400;

/// Upstream rejects very long historical ranges, so they are split.
const DEFAULT_HISTORICAL_WINDOW_DAYS: u32 = 365;

/// Default public site root.
pub const DEFAULT_BASE_URL: &str = "https://www.nseindia.com";

/// Default browser user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Configuration for [`NseClient`](crate::NseClient).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for each individual request attempt, in seconds.
    pub timeout_seconds: f64,
    /// How many times a blocked request is retried through a session refresh.
    pub max_retries: u32,
    /// User agent presented to the upstream site.
    pub user_agent: String,
    /// Site root that endpoint paths are joined to.
    pub base_url: String,
    /// Seconds a session is considered valid after its handshake.
    pub session_ttl_seconds: u64,
    /// Cookie names that must be present for a session to be valid.
    pub required_cookies: Vec<String>,
    /// Maximum number of days covered by a single historical request.
    pub historical_window_days: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECS,
            required_cookies: Vec::new(),
            historical_window_days: DEFAULT_HISTORICAL_WINDOW_DAYS,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from defaults overlaid with `NSE_*` environment variables.
    ///
    /// Recognized variables: `NSE_TIMEOUT_SECONDS`, `NSE_MAX_RETRIES`, `NSE_USER_AGENT`,
    /// `NSE_BASE_URL`, `NSE_SESSION_TTL_SECONDS`, `NSE_HISTORICAL_WINDOW_DAYS`.
    pub fn from_env() -> Result<Self, MarketDataError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, MarketDataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("NSE_TIMEOUT_SECONDS") {
            config.timeout_seconds = parse_var("NSE_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = lookup("NSE_MAX_RETRIES") {
            config.max_retries = parse_var("NSE_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("NSE_USER_AGENT") {
            config.user_agent = value;
        }
        if let Some(value) = lookup("NSE_BASE_URL") {
            config.base_url = value;
        }
        if let Some(value) = lookup("NSE_SESSION_TTL_SECONDS") {
            config.session_ttl_seconds = parse_var("NSE_SESSION_TTL_SECONDS", &value)?;
        }
        if let Some(value) = lookup("NSE_HISTORICAL_WINDOW_DAYS") {
            config.historical_window_days = parse_var("NSE_HISTORICAL_WINDOW_DAYS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a client.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        let timeout = Duration::try_from_secs_f64(self.timeout_seconds);
        if !matches!(timeout, Ok(t) if !t.is_zero()) {
            return Err(MarketDataError::InvalidConfig(format!(
                "timeout_seconds must be a positive, representable duration, got {}",
                self.timeout_seconds
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(MarketDataError::InvalidConfig(
                "user_agent must not be blank".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(MarketDataError::InvalidConfig(format!(
                "base_url must be an absolute http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.session_ttl_seconds == 0 || self.session_ttl_seconds > MAX_SESSION_TTL_SECS {
            return Err(MarketDataError::InvalidConfig(format!(
                "session_ttl_seconds must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS, self.session_ttl_seconds
            )));
        }
        if self.historical_window_days == 0 {
            return Err(MarketDataError::InvalidConfig(
                "historical_window_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-attempt timeout as a [`Duration`].
    ///
    /// Falls back to the default when `timeout_seconds` is not a usable
    /// duration; [`validate`](Self::validate) reports such values.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Session lifetime as a [`Duration`], capped at one day.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds.min(MAX_SESSION_TTL_SECS))
    }

    /// Join an endpoint path (with leading slash) onto the base URL.
    pub(crate) fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path_and_query)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, MarketDataError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        MarketDataError::InvalidConfig(format!("{} has invalid value '{}': {}", key, value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.required_cookies.is_empty());
    }

    #[test]
    fn test_deserialize_partial_document_fills_defaults() {
        let json = r#"{"timeout_seconds": 2.5, "user_agent": "test-agent", "unknown": true}"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("NSE_TIMEOUT_SECONDS", "3"),
            ("NSE_MAX_RETRIES", "2"),
            ("NSE_USER_AGENT", "custom"),
            ("NSE_HISTORICAL_WINDOW_DAYS", "90"),
        ]))
        .unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.user_agent, "custom");
        assert_eq!(config.historical_window_days, 90);
        assert_eq!(config.session_ttl_seconds, DEFAULT_SESSION_TTL_SECS);
    }

    #[test]
    fn test_env_rejects_unparseable_value() {
        let result = ClientConfig::from_lookup(lookup_from(&[("NSE_MAX_RETRIES", "many")]));
        assert!(matches!(result, Err(MarketDataError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ClientConfig {
            timeout_seconds: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            user_agent: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            base_url: "www.nseindia.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            historical_window_days: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_timeouts() {
        for timeout_seconds in [1e20, -1.0, f64::NAN, f64::INFINITY] {
            let config = ClientConfig {
                timeout_seconds,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(MarketDataError::InvalidConfig(_))),
                "timeout_seconds = {} should be rejected",
                timeout_seconds
            );
            assert_eq!(config.timeout(), Duration::from_secs(10));
        }
    }

    #[test]
    fn test_validate_bounds_session_ttl() {
        let config = ClientConfig {
            session_ttl_seconds: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MarketDataError::InvalidConfig(_))
        ));
        assert_eq!(config.session_ttl(), Duration::from_secs(MAX_SESSION_TTL_SECS));

        let config = ClientConfig {
            session_ttl_seconds: MAX_SESSION_TTL_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_rejects_huge_timeout() {
        let result = ClientConfig::from_lookup(lookup_from(&[("NSE_TIMEOUT_SECONDS", "1e20")]));
        assert!(matches!(result, Err(MarketDataError::InvalidConfig(_))));
    }

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let config = ClientConfig {
            base_url: "https://example.test/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.url_for("/api/equity-master"),
            "https://example.test/api/equity-master"
        );
    }
}
