use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::{CatalogEndpoint, DEFAULT_BASE_URL, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
use crate::error::UframeError;

pub const DEFAULT_CONFIG_FILE: &str = "uframe.json";
pub const BASE_URL_ENV: &str = "UFRAME_BASE_URL";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values given explicitly on the command line; these win over everything.
#[derive(Debug, Default, Clone)]
pub struct EndpointOverrides {
    pub base_url: Option<String>,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `uframe.json` from the working directory when no path
    /// is given. Only the implicit default file may be absent.
    pub fn resolve(path: Option<&str>) -> Result<Config, UframeError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| UframeError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| UframeError::ConfigParse(err.to_string()))
    }

    /// Precedence: overrides, config file, `env_base_url`, built-in defaults.
    pub fn resolve_endpoint(
        config: &Config,
        env_base_url: Option<&str>,
        overrides: &EndpointOverrides,
    ) -> Result<CatalogEndpoint, UframeError> {
        let base_url = overrides
            .base_url
            .as_deref()
            .or(config.base_url.as_deref())
            .or(env_base_url.filter(|value| !value.trim().is_empty()))
            .unwrap_or(DEFAULT_BASE_URL);
        let port = overrides.port.or(config.port).unwrap_or(DEFAULT_PORT);
        let timeout = overrides
            .timeout_secs
            .or(config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(CatalogEndpoint::new(base_url, port)?.with_timeout(Duration::from_secs(timeout)))
    }
}
