//! Client configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DATAGATOR_*)
//! 2. TOML config file (if DATAGATOR_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Remote API generations understood by the client.
pub const API_VERSIONS: &[&str] = &["v1", "v2"];

/// Host of the public service; the default base URL is `<host>/api/<api_version>`.
pub const DEFAULT_API_HOST: &str = "https://www.data-gator.com";

/// Client configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DATAGATOR_*)
/// 2. TOML config file (if DATAGATOR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote service. Derived from `api_version` when unset.
    ///
    /// Set via DATAGATOR_API_URL environment variable.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Remote API generation: `v1` commits with PUT, `v2` with PATCH.
    ///
    /// Set via DATAGATOR_API_VERSION environment variable.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via DATAGATOR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via DATAGATOR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether HTTP redirects are followed.
    ///
    /// Set via DATAGATOR_FOLLOW_REDIRECTS environment variable.
    #[serde(default)]
    pub follow_redirects: bool,

    /// Size at which a pending revision is committed automatically.
    ///
    /// Set via DATAGATOR_MAX_PAYLOAD_BYTES environment variable.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Size past which a revision's staging buffer spills to disk.
    ///
    /// Set via DATAGATOR_MAX_BUFFER_BYTES environment variable.
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: usize,

    /// Directory for the cache database. A private temporary directory is
    /// used when unset. Either way it is destroyed when the cache is torn down.
    ///
    /// Set via DATAGATOR_CACHE_DIR environment variable.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Repository name used for Basic authentication.
    ///
    /// Set via DATAGATOR_REPO environment variable.
    #[serde(default)]
    pub repo: Option<String>,

    /// Repository access key used for Basic authentication.
    ///
    /// Set via DATAGATOR_ACCESS_KEY environment variable.
    #[serde(default)]
    pub access_key: Option<String>,
}

fn default_api_version() -> String {
    "v2".into()
}

fn default_user_agent() -> String {
    concat!("datagator-client/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout_ms() -> u64 {
    180_000
}

fn default_max_payload_bytes() -> usize {
    16 * 1024 * 1024 // 16MB
}

fn default_max_buffer_bytes() -> usize {
    64 * 1024 // 64kB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_version: default_api_version(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            follow_redirects: false,
            max_payload_bytes: default_max_payload_bytes(),
            max_buffer_bytes: default_max_buffer_bytes(),
            cache_dir: None,
            repo: None,
            access_key: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL requests are resolved against.
    pub fn service_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.clone(),
            None => format!("{DEFAULT_API_HOST}/api/{}", self.api_version),
        }
    }

    /// Whether the legacy v1 API is targeted.
    pub fn is_v1(&self) -> bool {
        self.api_version == "v1"
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DATAGATOR_`
    /// 2. TOML file from `DATAGATOR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DATAGATOR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DATAGATOR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Basic-auth credentials, required before mutating a repository.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if either half of the pair is unset.
    pub fn require_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let repo = self.repo.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "repo".into(),
            hint: "Set DATAGATOR_REPO environment variable".into(),
        })?;
        let key = self.access_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "access_key".into(),
            hint: "Set DATAGATOR_ACCESS_KEY environment variable".into(),
        })?;
        Ok((repo, key))
    }
}
