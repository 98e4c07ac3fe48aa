use std::io::Read;

use serde::Deserialize;
use tracing::warn;

use crate::domain::{FileFormat, RecordLimit, ReferenceDesignator, Stage};
use crate::endpoint::CatalogEndpoint;
use crate::error::UframeError;
use crate::output::read_rows;
use crate::url::{RequestFlags, StreamRequest, build_stream_url};

pub const STREAM_ROW_COLUMNS: [&str; 5] = ["stream", "beginTime", "endTime", "sensor", "method"];

/// One deployment row, as written by the `deployments` listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamRow {
    pub stream: String,
    #[serde(rename = "beginTime")]
    pub begin_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    /// Reference designator of the instrument.
    pub sensor: String,
    pub method: String,
}

pub fn read_stream_rows<R: Read>(input: R) -> Result<Vec<StreamRow>, UframeError> {
    read_rows(input, &STREAM_ROW_COLUMNS)
}

/// Flags for full-deployment asynchronous requests.
pub fn full_deployment_flags() -> RequestFlags {
    RequestFlags {
        format: FileFormat::Netcdf,
        exec_dpa: true,
        include_provenance: true,
        limit: RecordLimit::Unlimited,
    }
}

/// One request URL per row covering the row's whole time extent. Rows whose
/// sensor is not a reference designator are logged and skipped.
pub fn build_query_urls(endpoint: &CatalogEndpoint, rows: &[StreamRow]) -> Vec<String> {
    let flags = full_deployment_flags();
    rows.iter()
        .filter_map(|row| {
            let refdes = match row.sensor.parse::<ReferenceDesignator>() {
                Ok(refdes) => refdes,
                Err(err) => {
                    warn!(stage = %Stage::Stream, "{err}");
                    return None;
                }
            };
            let request = StreamRequest {
                subsite: refdes.subsite().to_string(),
                node: refdes.node().to_string(),
                sensor: refdes.sensor().to_string(),
                method: row.method.clone(),
                stream: row.stream.clone(),
                begin: row.begin_time.clone(),
                end: row.end_time.clone(),
            };
            Some(build_stream_url(endpoint, &request, &flags))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn builds_unlimited_netcdf_urls() {
        let input = "stream,beginTime,endTime,sensor,method,count\n\
                     A_sample,2015-01-01T00:00:00.000Z,2015-06-01T00:00:00.000Z,CE01ISSM-MFD35-02-PRESFA000,telemetered,12\n\
                     A_sample,2015-01-01T00:00:00.000Z,2015-06-01T00:00:00.000Z,bogus,telemetered,3\n";
        let rows = read_stream_rows(input.as_bytes()).unwrap();
        let endpoint = CatalogEndpoint::new("http://catalog.example", 12576).unwrap();
        let urls = build_query_urls(&endpoint, &rows);
        assert_eq!(
            urls,
            vec![
                "http://catalog.example:12576/sensor/inv/CE01ISSM/MFD35/02-PRESFA000/telemetered/A_sample\
                 ?beginDT=2015-01-01T00:00:00.000Z&endDT=2015-06-01T00:00:00.000Z&limit=-1\
                 &execDPA=true&format=application/netcdf&include_provenance=true"
                    .to_string()
            ]
        );
    }

    #[test]
    fn missing_column_is_rejected() {
        let input = "stream,beginTime,sensor,method\nA,2015-01-01T00:00:00Z,X-Y-Z-W,telemetered\n";
        let err = read_stream_rows(input.as_bytes()).unwrap_err();
        assert_matches!(err, UframeError::MissingColumn(column) if column == "endTime");
    }
}
