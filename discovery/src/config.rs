//! Client configuration
//!
//! Default config location: ~/.discovery/config.toml
//!
//! Environment variables override the file: `DISCOVERY_URL`,
//! `DISCOVERY_VERSION`, `DISCOVERY_APIKEY`, `DISCOVERY_USERNAME`,
//! `DISCOVERY_PASSWORD`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregation::{AggregationDecoder, UnknownKindPolicy};
use crate::error::{Error, Result};
use crate::transport::Credentials;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// API version date sent with every request
    #[serde(default = "default_version")]
    pub version: String,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Headers added to every request, e.g. `X-Watson-Learning-Opt-Out`
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

fn default_url() -> String {
    "https://gateway.watsonplatform.net/discovery/api".to_string()
}

fn default_version() -> String {
    "2017-11-07".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            version: default_version(),
            api_key: None,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    /// An API key wins over username/password.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(key) = &self.api_key {
            return Ok(Credentials::ApiKey(key.clone()));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None) => Ok(Credentials::None),
            (Some(_), None) => Err(Error::Config("username set without password".to_string())),
            (None, Some(_)) => Err(Error::Config("password set without username".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DecodeConfig {
    /// Drop aggregation kinds this client does not know instead of failing
    #[serde(default)]
    pub tolerate_unknown_aggregations: bool,
}

impl DecodeConfig {
    pub fn decoder(&self) -> AggregationDecoder {
        if self.tolerate_unknown_aggregations {
            AggregationDecoder::new(UnknownKindPolicy::Skip)
        } else {
            AggregationDecoder::new(UnknownKindPolicy::Fail)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home =
        dirs::home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".into()))?;
    Ok(home.join(rest))
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        expand_tilde(Path::new("~/.discovery/config.toml"))
    }

    /// Load from the default location, with environment overrides applied
    pub fn load() -> Result<Self> {
        let mut config = Self::load_or_default(&Self::default_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from file path, or fall back to defaults if it does not exist
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get("DISCOVERY_URL") {
            self.service.url = url;
        }
        if let Some(version) = get("DISCOVERY_VERSION") {
            self.service.version = version;
        }
        if let Some(key) = get("DISCOVERY_APIKEY") {
            self.service.api_key = Some(key);
        }
        if let Some(username) = get("DISCOVERY_USERNAME") {
            self.service.username = Some(username);
        }
        if let Some(password) = get("DISCOVERY_PASSWORD") {
            self.service.password = Some(password);
        }
    }
}
