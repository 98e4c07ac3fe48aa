use std::fmt;
use std::time::Duration;

use crate::error::UframeError;

pub const DEFAULT_BASE_URL: &str = "http://uframe-test.ooi.rutgers.edu";
pub const DEFAULT_PORT: u16 = 12576;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Location of a uFrame catalog server.
///
/// The catalog root (`{base_url}:{port}/sensor/inv`) is derived once at
/// construction. There are no setters: the `with_*` methods build a new value,
/// so the root can never lag behind the base URL or port it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoint {
    base_url: String,
    port: u16,
    timeout: Duration,
    root: String,
}

impl CatalogEndpoint {
    pub fn new(base_url: &str, port: u16) -> Result<Self, UframeError> {
        Self::with_parts(base_url, port, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    fn with_parts(base_url: &str, port: u16, timeout: Duration) -> Result<Self, UframeError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let has_scheme = base_url.starts_with("http://") || base_url.starts_with("https://");
        let host = base_url
            .trim_start_matches("http://")
            .trim_start_matches("https://");
        if !has_scheme || host.is_empty() || host.contains('/') {
            return Err(UframeError::InvalidEndpoint(format!(
                "base url must look like http://host, got {base_url:?}"
            )));
        }
        if port == 0 {
            return Err(UframeError::InvalidEndpoint("port must be non-zero".to_string()));
        }
        let root = format!("{base_url}:{port}/sensor/inv");
        Ok(Self {
            base_url,
            port,
            timeout,
            root,
        })
    }

    pub fn with_base_url(&self, base_url: &str) -> Result<Self, UframeError> {
        Self::with_parts(base_url, self.port, self.timeout)
    }

    pub fn with_port(&self, port: u16) -> Result<Self, UframeError> {
        Self::with_parts(&self.base_url, port, self.timeout)
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Catalog root, `{base_url}:{port}/sensor/inv`.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn url_for(&self, segments: &[&str]) -> String {
        let mut url = self.root.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }
}

impl Default for CatalogEndpoint {
    fn default() -> Self {
        let base_url = DEFAULT_BASE_URL.to_string();
        let root = format!("{base_url}:{DEFAULT_PORT}/sensor/inv");
        Self {
            base_url,
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            root,
        }
    }
}

impl fmt::Display for CatalogEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
