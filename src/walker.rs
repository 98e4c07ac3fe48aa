use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::domain::Stage;
use crate::error::UframeError;
use crate::fetch::FetchOutcome;
use crate::http::Transport;
use crate::url::{RequestFlags, StreamRequest};
use crate::window::{Delta, resolve_window};

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub delta: Delta,
    /// Root of the download tree; unused when `url_only` is set.
    pub dest_root: Option<Utf8PathBuf>,
    pub flags: RequestFlags,
    pub url_only: bool,
}

/// A unit of the inventory that produced no fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    pub stage: Stage,
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkReport {
    pub array: String,
    /// One outcome per fetched stream, in discovery order.
    pub outcomes: Vec<FetchOutcome>,
    pub skipped: Vec<Skip>,
}

impl WalkReport {
    fn skip(&mut self, stage: Stage, identifier: String, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(stage = %stage, id = %identifier, "{reason}");
        self.skipped.push(Skip {
            stage,
            identifier,
            reason,
        });
    }
}

impl<T: Transport> CatalogClient<T> {
    /// Fetches the most recent `options.delta` of every stream under one array.
    ///
    /// Only a configuration error or an unknown array aborts the walk. Any
    /// other failure skips that platform, sensor or stream and the walk moves
    /// on to its next sibling.
    pub fn walk_array(&self, array_id: &str, options: &WalkOptions) -> Result<WalkReport, UframeError> {
        if array_id.is_empty() {
            return Err(UframeError::MissingIdentifier("array"));
        }
        let dest_root = match (&options.dest_root, options.url_only) {
            (_, true) => None,
            (Some(root), false) => Some(root),
            (None, false) => return Err(UframeError::MissingIdentifier("destination directory")),
        };

        info!(stage = %Stage::Array, endpoint = %self.endpoint(), "fetching arrays");
        let array = self
            .list_arrays(Some(array_id))
            .into_iter()
            .next()
            .ok_or_else(|| UframeError::ArrayNotFound(array_id.to_string()))?;
        info!(stage = %Stage::Array, array = %array, "array exists");

        let mut report = WalkReport {
            array: array.clone(),
            ..WalkReport::default()
        };

        let platforms = self.list_platforms(&array);
        if platforms.is_empty() {
            report.skip(Stage::Array, array, "no platforms found for array");
            return Ok(report);
        }

        for platform in &platforms {
            let platform_name = format!("{array}-{platform}");
            let sensors = self.list_sensors(&array, platform);
            if sensors.is_empty() {
                report.skip(Stage::Platform, platform_name, "no data sensors found for platform");
                continue;
            }
            info!(stage = %Stage::Platform, platform = %platform_name, "{} sensors fetched", sensors.len());

            for sensor in &sensors {
                let Some(metadata) = self.sensor_metadata(&array, platform, sensor) else {
                    report.skip(
                        Stage::Metadata,
                        format!("{platform_name}-{sensor}"),
                        "no metadata found for sensor",
                    );
                    continue;
                };

                for times in &metadata.times {
                    let window = match resolve_window(&times.end_time, options.delta) {
                        Ok(window) => window,
                        Err(err) => {
                            report.skip(
                                Stage::Stream,
                                format!("{platform_name}-{sensor}/{}/{}", times.method, times.stream),
                                err.to_string(),
                            );
                            continue;
                        }
                    };
                    let request = StreamRequest {
                        subsite: array.clone(),
                        node: platform.clone(),
                        sensor: sensor.clone(),
                        method: times.method.clone(),
                        stream: times.stream.clone(),
                        begin: window.begin_iso,
                        end: window.end_iso,
                    };
                    let dest_dir =
                        dest_root.map(|root| root.join(&platform_name).join(&times.method));
                    let outcome = self.fetch_stream(
                        &request,
                        &options.flags,
                        options.url_only,
                        dest_dir.as_deref(),
                    );
                    report.outcomes.push(outcome);
                }
            }
        }

        Ok(report)
    }
}
