use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::{SensorMetadata, Stage};
use crate::endpoint::CatalogEndpoint;
use crate::error::UframeError;
use crate::http::{HttpTransport, Transport};
use crate::url::metadata_url;

const HTTP_STATUS_OK: u16 = 200;

/// Read access to the four inventory levels of one catalog server.
///
/// Every lookup issues exactly one request. Failures (transport errors,
/// non-200 responses, undecodable bodies) are logged with the stage and URL
/// and come back as an empty result; they are never returned as errors.
#[derive(Clone)]
pub struct CatalogClient<T: Transport> {
    endpoint: CatalogEndpoint,
    transport: T,
}

impl CatalogClient<HttpTransport> {
    pub fn new(endpoint: CatalogEndpoint) -> Result<Self, UframeError> {
        let transport = HttpTransport::new(endpoint.timeout())?;
        Ok(Self::with_transport(endpoint, transport))
    }
}

impl<T: Transport> CatalogClient<T> {
    pub fn with_transport(endpoint: CatalogEndpoint, transport: T) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn endpoint(&self) -> &CatalogEndpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Array names on the server. With `filter`, a one-element list holding
    /// the filter if the server knows it, else an empty list.
    pub fn list_arrays(&self, filter: Option<&str>) -> Vec<String> {
        let url = self.endpoint.root().to_string();
        let arrays: Vec<String> = self.get_or_empty(Stage::Array, &url);
        match filter {
            None => arrays,
            Some(id) if arrays.iter().any(|array| array == id) => vec![id.to_string()],
            Some(_) => Vec::new(),
        }
    }

    pub fn list_platforms(&self, array: &str) -> Vec<String> {
        if array.is_empty() {
            warn!(stage = %Stage::Platform, "{}", UframeError::MissingIdentifier("array"));
            return Vec::new();
        }
        let url = self.endpoint.url_for(&[array]);
        self.get_or_empty(Stage::Platform, &url)
    }

    pub fn list_sensors(&self, array: &str, platform: &str) -> Vec<String> {
        if let Err(err) = require(&[("array", array), ("platform", platform)]) {
            warn!(stage = %Stage::Sensor, "{err}");
            return Vec::new();
        }
        let url = self.endpoint.url_for(&[array, platform]);
        self.get_or_empty(Stage::Sensor, &url)
    }

    /// Metadata with neither parameters nor stream records comes back as
    /// `None`, the same as a failed lookup.
    pub fn sensor_metadata(
        &self,
        array: &str,
        platform: &str,
        sensor: &str,
    ) -> Option<SensorMetadata> {
        if let Err(err) = require(&[("array", array), ("platform", platform), ("sensor", sensor)]) {
            warn!(stage = %Stage::Metadata, "{err}");
            return None;
        }
        let url = metadata_url(&self.endpoint, array, platform, sensor);
        match self.get_json::<SensorMetadata>(&url) {
            Ok(metadata) if metadata.is_empty() => {
                warn!(stage = %Stage::Metadata, url = %url, "metadata response is empty");
                None
            }
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(stage = %Stage::Metadata, url = %url, "{err}");
                None
            }
        }
    }

    fn get_or_empty<R: DeserializeOwned + Default>(&self, stage: Stage, url: &str) -> R {
        self.get_json(url).unwrap_or_else(|err| {
            warn!(stage = %stage, url = %url, "{err}");
            R::default()
        })
    }

    fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, UframeError> {
        debug!(url = %url, "catalog.request");
        let response = self
            .transport
            .get(url)
            .map_err(|err| UframeError::Transport(format!("{err}: {url}")))?;
        if response.status != HTTP_STATUS_OK {
            return Err(UframeError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }
        serde_json::from_reader(response.body).map_err(|err| UframeError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

fn require(identifiers: &[(&'static str, &str)]) -> Result<(), UframeError> {
    match identifiers.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => Err(UframeError::MissingIdentifier(*name)),
        None => Ok(()),
    }
}
