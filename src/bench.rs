use std::io::Read;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::CatalogClient;
use crate::error::UframeError;
use crate::http::Transport;
use crate::output::read_rows;
use crate::url::{RequestFlags, StreamRequest};

pub const BENCH_ROW_COLUMNS: [&str; 7] = [
    "subsite",
    "node",
    "sensor",
    "method",
    "stream",
    "begin_datetime",
    "end_datetime",
];

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Wall-clock bounds of one measured operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub started: DateTime<Utc>,
    pub stopped: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Runs `operation` and reports how long it took.
pub fn measure<R>(operation: impl FnOnce() -> R) -> (R, Timing) {
    let started = Utc::now();
    let clock = Instant::now();
    let result = operation();
    let elapsed = clock.elapsed();
    let timing = Timing {
        started,
        stopped: Utc::now(),
        elapsed,
    };
    (result, timing)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BenchRow {
    pub subsite: String,
    pub node: String,
    pub sensor: String,
    pub method: String,
    pub stream: String,
    pub begin_datetime: String,
    pub end_datetime: String,
}

impl From<&BenchRow> for StreamRequest {
    fn from(row: &BenchRow) -> Self {
        Self {
            subsite: row.subsite.clone(),
            node: row.node.clone(),
            sensor: row.sensor.clone(),
            method: row.method.clone(),
            stream: row.stream.clone(),
            begin: row.begin_datetime.clone(),
            end: row.end_datetime.clone(),
        }
    }
}

pub fn read_bench_rows<R: Read>(input: R) -> Result<Vec<BenchRow>, UframeError> {
    read_rows(input, &BENCH_ROW_COLUMNS)
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub urls: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub total_bytes: u64,
    pub elapsed_secs: Option<f64>,
}

impl BenchReport {
    /// Volume over time in MB/s; `None` without a timed download run.
    pub fn megabytes_per_sec(&self) -> Option<f64> {
        self.elapsed_secs
            .filter(|secs| *secs > 0.0)
            .map(|secs| self.total_bytes as f64 / BYTES_PER_MEGABYTE / secs)
    }
}

impl<T: Transport> CatalogClient<T> {
    /// Downloads every row into a scratch directory that is removed
    /// afterwards, and measures the throughput of the whole batch.
    pub fn benchmark(
        &self,
        rows: &[BenchRow],
        flags: &RequestFlags,
        url_only: bool,
    ) -> Result<BenchReport, UframeError> {
        if url_only {
            let urls = rows
                .iter()
                .map(|row| self.fetch_stream(&StreamRequest::from(row), flags, true, None).url)
                .collect();
            return Ok(BenchReport {
                urls,
                succeeded: 0,
                failed: 0,
                total_bytes: 0,
                elapsed_secs: None,
            });
        }

        let scratch = tempfile::Builder::new()
            .prefix("uframe-bench")
            .tempdir()
            .map_err(|err| UframeError::Filesystem(err.to_string()))?;
        let dest = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
            .map_err(|_| UframeError::Filesystem("non-utf8 temporary directory".to_string()))?;
        info!(dir = %dest, "using temp download path");

        let (outcomes, timing) = measure(|| {
            rows.iter()
                .map(|row| self.fetch_stream(&StreamRequest::from(row), flags, false, Some(dest.as_path())))
                .collect::<Vec<_>>()
        });
        info!(started = %timing.started, stopped = %timing.stopped, "benchmark finished");

        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        let report = BenchReport {
            urls: outcomes.iter().map(|outcome| outcome.url.clone()).collect(),
            succeeded,
            failed: outcomes.len() - succeeded,
            total_bytes: outcomes.iter().map(|outcome| outcome.bytes).sum(),
            elapsed_secs: Some(timing.elapsed.as_secs_f64()),
        };
        scratch
            .close()
            .map_err(|err| UframeError::Filesystem(err.to_string()))?;
        Ok(report)
    }
}
