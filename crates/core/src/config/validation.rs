//! Sanity checks on a loaded `AppConfig`: service URL and protocol
//! version, revision size bounds, HTTP timeout, credentials.

use crate::config::{API_VERSIONS, AppConfig};
use thiserror::Error;

/// Failure to load or accept the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MIN_PAYLOAD_BYTES: usize = 1024;
const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `api_url` is not an http(s) URL
    /// - `api_version` is not one of `v1`, `v2`
    /// - `api_url` names an `api/<version>` path other than `api_version`
    /// - `max_payload_bytes` is below 1kB or exceeds 64MB
    /// - `max_buffer_bytes` is 0 or larger than `max_payload_bytes`
    /// - `timeout_ms` is less than 100ms or exceeds 10 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.service_url())
            .map_err(|e| ConfigError::Invalid { field: "api_url".into(), reason: e.to_string() })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "api_url".into(), reason: "must be an http(s) URL".into() });
        }

        if !API_VERSIONS.contains(&self.api_version.as_str()) {
            return Err(ConfigError::Invalid {
                field: "api_version".into(),
                reason: format!("must be one of {API_VERSIONS:?}"),
            });
        }

        let targeted = url
            .path_segments()
            .into_iter()
            .flatten()
            .find(|segment| API_VERSIONS.contains(segment) && *segment != self.api_version);
        if let Some(other) = targeted {
            return Err(ConfigError::Invalid {
                field: "api_url".into(),
                reason: format!("targets the {other} API but api_version is {}", self.api_version),
            });
        }

        if self.max_payload_bytes < MIN_PAYLOAD_BYTES {
            return Err(ConfigError::Invalid {
                field: "max_payload_bytes".into(),
                reason: "must be at least 1kB".into(),
            });
        }
        if self.max_payload_bytes > MAX_PAYLOAD_BYTES {
            return Err(ConfigError::Invalid {
                field: "max_payload_bytes".into(),
                reason: "must not exceed 64MB".into(),
            });
        }

        if self.max_buffer_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_buffer_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.max_buffer_bytes > self.max_payload_bytes {
            return Err(ConfigError::Invalid {
                field: "max_buffer_bytes".into(),
                reason: "must not exceed max_payload_bytes".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.repo.is_some() != self.access_key.is_some() {
            tracing::warn!(
                repo_set = self.repo.is_some(),
                access_key_set = self.access_key.is_some(),
                "Only one of repo and access_key is set; requests will be sent unauthenticated"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_api_url() {
        let config = AppConfig { api_url: Some("not a url".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_url"));

        let config = AppConfig { api_url: Some("ftp://data-gator.com".into()), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_api_url_matches_version() {
        let config = AppConfig { api_version: "v1".into(), ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig {
            api_url: Some("https://www.data-gator.com/api/v1/".into()),
            api_version: "v2".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "api_url"));

        let config = AppConfig {
            api_url: Some("http://localhost:8080/".into()),
            api_version: "v1".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_api_version() {
        let config = AppConfig { api_version: "v3".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_version"));
    }

    #[test]
    fn test_validate_payload_too_small() {
        let config = AppConfig { max_payload_bytes: 512, max_buffer_bytes: 256, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_payload_bytes"));
    }

    #[test]
    fn test_validate_payload_exceeds_limit() {
        let config = AppConfig { max_payload_bytes: 65 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_payload_bytes"));
    }

    #[test]
    fn test_validate_buffer_larger_than_payload() {
        let config = AppConfig { max_payload_bytes: 4096, max_buffer_bytes: 8192, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_buffer_bytes"));
    }

    #[test]
    fn test_validate_buffer_zero() {
        let config = AppConfig { max_buffer_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_buffer_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 600_001, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_payload_bytes: 1024, max_buffer_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig {
            max_payload_bytes: 64 * 1024 * 1024,
            max_buffer_bytes: 64 * 1024 * 1024,
            timeout_ms: 600_000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_half_credentials_is_not_an_error() {
        let config = AppConfig { repo: Some("Pardee".into()), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
