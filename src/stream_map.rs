use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::catalog::CatalogClient;
use crate::domain::{ParameterMetadata, ReferenceDesignator, SensorMetadata, Stage, StreamMetadata};
use crate::http::Transport;
use crate::url::metadata_url;

/// A parameter joined with one stream record it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMapEntry {
    pub parameter: ParameterMetadata,
    pub stream: StreamMetadata,
    pub metadata_url: String,
}

impl StreamMapEntry {
    pub fn is_calculated(&self) -> bool {
        self.parameter.is_calculated()
    }
}

/// Joins each distinct parameter with every `times` record of its stream.
///
/// Repeated particle keys are dropped, keeping the first record. `method`
/// restricts the join to stream records of that acquisition method.
pub fn map_streams(metadata: &SensorMetadata, url: &str, method: Option<&str>) -> Vec<StreamMapEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for parameter in &metadata.parameters {
        if !seen.insert(parameter.particle_key.as_str()) {
            continue;
        }
        let matching = metadata.times.iter().filter(|times| {
            times.stream == parameter.stream && method.is_none_or(|method| times.method == method)
        });
        for times in matching {
            entries.push(StreamMapEntry {
                parameter: parameter.clone(),
                stream: times.clone(),
                metadata_url: url.to_string(),
            });
        }
    }
    entries
}

impl<T: Transport> CatalogClient<T> {
    /// Stream map for one array, or for every array when `array` is `None`.
    pub fn map_array_streams(&self, array: Option<&str>, method: Option<&str>) -> Vec<StreamMapEntry> {
        let mut arrays = self.list_arrays(None);
        if arrays.is_empty() {
            warn!(stage = %Stage::Array, endpoint = %self.endpoint(), "uFrame instance contains no arrays");
            return Vec::new();
        }
        if let Some(array) = array {
            if !arrays.iter().any(|known| known == array) {
                warn!(stage = %Stage::Array, id = %array, "invalid array specified");
                return Vec::new();
            }
            arrays = vec![array.to_string()];
        }

        let mut entries = Vec::new();
        self.visit_sensors(&arrays, |path, metadata| {
            let url = metadata_url(self.endpoint(), path.array, path.platform, path.sensor);
            entries.extend(map_streams(&metadata, &url, method));
        });
        entries
    }

    pub fn map_reference_designator(
        &self,
        refdes: &ReferenceDesignator,
        method: Option<&str>,
    ) -> Vec<StreamMapEntry> {
        let Some(metadata) = self.sensor_metadata(refdes.subsite(), refdes.node(), refdes.sensor())
        else {
            warn!(stage = %Stage::Metadata, id = %refdes, "no metadata found");
            return Vec::new();
        };
        let url = metadata_url(self.endpoint(), refdes.subsite(), refdes.node(), refdes.sensor());
        map_streams(&metadata, &url, method)
    }
}
