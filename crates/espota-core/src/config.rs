//! Server configuration (TOML)
//!
//! Every section and key is optional:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! route = "/update"
//!
//! [store]
//! binary_dir = "bin"
//! catalog_file = "xremote_latest.txt"
//!
//! [log]
//! file_pattern = "logx_%Y.%-m.%-d.log"
//!
//! [update]
//! user_agent = "ESP8266-http-Update"
//! trust_forwarded_for = false
//! cache_digests = false
//! ```

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use thiserror::Error;

use crate::request::ESP8266_USER_AGENT;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
    pub update: UpdatePolicy,
}

/// Listener and routing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the update endpoint is mounted at
    pub route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            route: "/update".to_string(),
        }
    }
}

/// Binary store and catalog location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub binary_dir: PathBuf,
    /// Catalog file name, relative to `binary_dir`
    pub catalog_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            binary_dir: PathBuf::from("bin"),
            catalog_file: "xremote_latest.txt".to_string(),
        }
    }
}

/// Request log location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// chrono strftime pattern expanded with the local date
    pub file_pattern: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_pattern: "logx_%Y.%-m.%-d.log".to_string(),
        }
    }
}

/// Request acceptance policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdatePolicy {
    /// Required User-Agent value
    pub user_agent: String,
    /// Take the client address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
    /// Reuse digests of unchanged binaries
    pub cache_digests: bool,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            user_agent: ESP8266_USER_AGENT.to_string(),
            trust_forwarded_for: false,
            cache_digests: false,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.route.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.route must start with '/': {:?}",
                self.server.route
            )));
        }
        if self.server.route == "/health" {
            return Err(ConfigError::Invalid(
                "server.route conflicts with /health".to_string(),
            ));
        }
        if self.store.catalog_file.is_empty() {
            return Err(ConfigError::Invalid("store.catalog_file is empty".to_string()));
        }
        if self.update.user_agent.is_empty() {
            return Err(ConfigError::Invalid("update.user_agent is empty".to_string()));
        }
        if self.log.file_pattern.is_empty() {
            return Err(ConfigError::Invalid("log.file_pattern is empty".to_string()));
        }
        if StrftimeItems::new(&self.log.file_pattern).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "log.file_pattern is not a valid date pattern: {:?}",
                self.log.file_pattern
            )));
        }
        Ok(())
    }

    /// Full path of the catalog file
    pub fn catalog_path(&self) -> PathBuf {
        self.store.binary_dir.join(&self.store.catalog_file)
    }
}
