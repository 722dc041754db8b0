//! Configuration types for listen-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest number of ids the audio-features endpoint accepts per request
pub const MAX_BATCH_SIZE: usize = 100;

/// HTTP client configuration (endpoint, identification, status policy)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base endpoint every relative path is joined to (default: "https://api.spotify.com/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (None = wait for the server indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// Fail on any non-2xx response other than 429 (default: true)
    ///
    /// Page walking and list fetching always check status regardless of this flag;
    /// it only affects direct [`crate::client::ApiClient::fetch`] calls that do not
    /// override it.
    #[serde(default = "default_true")]
    pub strict_status: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: None,
            strict_status: true,
        }
    }
}

/// Pipeline behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of tracks per audio-features lookup (default: 100, max: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attach the token owner's profile to every record under `user` (default: false)
    #[serde(default)]
    pub attach_user: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            attach_user: false,
        }
    }
}

/// Top-level configuration
///
/// # Example
///
/// ```
/// use listen_harvest::Config;
///
/// let config: Config = serde_json::from_str(r#"{"pipeline": {"attach_user": true}}"#).unwrap();
/// assert_eq!(config.pipeline.batch_size, 100);
/// assert!(config.pipeline.attach_user);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Check that every setting is usable
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.api.base_url, e),
            key: Some("api.base_url".to_string()),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base URL must be http or https, got '{}'", base.scheme()),
                key: Some("api.base_url".to_string()),
            });
        }

        if self.pipeline.batch_size == 0 || self.pipeline.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config {
                message: format!(
                    "batch size must be between 1 and {}, got {}",
                    MAX_BATCH_SIZE, self.pipeline.batch_size
                ),
                key: Some("pipeline.batch_size".to_string()),
            });
        }

        if self.api.request_timeout == Some(Duration::ZERO) {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("api.request_timeout".to_string()),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_user_agent() -> String {
    concat!("listen-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://api.spotify.com/v1");
        assert!(config.api.strict_status);
        assert!(config.api.request_timeout.is_none());
        assert_eq!(config.pipeline.batch_size, 100);
        assert!(!config.pipeline.attach_user);
        config.validate().unwrap();
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pipeline.batch_size, 100);
        assert!(config.api.user_agent.starts_with("listen-harvest/"));
    }

    #[test]
    fn request_timeout_round_trips_as_seconds() {
        let config = ApiConfig {
            request_timeout: Some(Duration::from_secs(30)),
            ..ApiConfig::default()
        };

        let json = serde_json::to_value(&config).expect("serialize failed");
        assert_eq!(
            json["request_timeout"], 30,
            "optional_duration_serde must serialize Duration as integer seconds"
        );

        let back: ApiConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = Config::default();
        config.pipeline.batch_size = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("pipeline.batch_size"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let mut config = Config::default();
        config.pipeline.batch_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let mut config = Config::default();
        config.api.base_url = "ftp://api.example.com".to_string();

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("api.base_url")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_base_url_is_rejected() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
