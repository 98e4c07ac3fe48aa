use tracing::warn;

use crate::catalog::CatalogClient;
use crate::domain::{ReferenceDesignator, SensorMetadata, Stage, StreamMetadata};
use crate::http::Transport;

/// Position of a sensor in the catalog hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct SensorPath<'a> {
    pub array: &'a str,
    pub platform: &'a str,
    pub sensor: &'a str,
}

impl<T: Transport> CatalogClient<T> {
    /// Visits the metadata of every sensor under `arrays`, in catalog order.
    /// Levels that come back empty are logged and skipped.
    pub fn visit_sensors<F>(&self, arrays: &[String], mut visit: F)
    where
        F: FnMut(SensorPath<'_>, SensorMetadata),
    {
        for array in arrays {
            let platforms = self.list_platforms(array);
            if platforms.is_empty() {
                warn!(stage = %Stage::Array, id = %array, "array contains no platforms");
                continue;
            }
            for platform in &platforms {
                let sensors = self.list_sensors(array, platform);
                if sensors.is_empty() {
                    warn!(stage = %Stage::Platform, id = %format!("{array}-{platform}"), "platform contains no sensors");
                    continue;
                }
                for sensor in &sensors {
                    let Some(metadata) = self.sensor_metadata(array, platform, sensor) else {
                        warn!(stage = %Stage::Metadata, id = %format!("{array}-{platform}-{sensor}"), "no metadata found");
                        continue;
                    };
                    let path = SensorPath {
                        array,
                        platform,
                        sensor,
                    };
                    visit(path, metadata);
                }
            }
        }
    }

    /// Stream time extents recorded for one instrument.
    pub fn sensor_streams(&self, refdes: &ReferenceDesignator) -> Vec<StreamMetadata> {
        match self.sensor_metadata(refdes.subsite(), refdes.node(), refdes.sensor()) {
            Some(metadata) => metadata.times,
            None => {
                warn!(stage = %Stage::Metadata, id = %refdes, "no metadata found");
                Vec::new()
            }
        }
    }

    /// Every deployment of `target_stream` across the whole catalog.
    pub fn find_stream_deployments(&self, target_stream: &str) -> Vec<StreamMetadata> {
        let arrays = self.list_arrays(None);
        if arrays.is_empty() {
            warn!(stage = %Stage::Array, endpoint = %self.endpoint(), "no arrays found");
            return Vec::new();
        }
        let mut deployments = Vec::new();
        self.visit_sensors(&arrays, |_, metadata| {
            deployments.extend(
                metadata
                    .times
                    .into_iter()
                    .filter(|times| times.stream == target_stream),
            );
        });
        if deployments.is_empty() {
            warn!(stage = %Stage::Stream, id = %target_stream, "no reference designators found for stream");
        }
        deployments
    }
}
