use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::domain::{ReferenceDesignator, SensorMetadata, Stage, StreamMetadata};
use crate::error::UframeError;
use crate::http::Transport;
use crate::url::metadata_url;

pub const RECOVERED: &str = "recovered";
pub const TELEMETERED: &str = "telemetered";

pub const RESULT_COLUMNS: [&str; 9] = [
    "DataStreamR Available",
    "ParameterID_R Available",
    "ParameterID_R in Stream",
    "DataStreamT Available",
    "ParameterID_T Available",
    "ParameterID_T in Stream",
    "UFrame DataStreamR",
    "UFrame DataStreamT",
    "UFrame Metadata URL",
];

// Input columns, by position.
const REFDES_COLUMN: usize = 1;
const RECOVERED_STREAM_COLUMN: usize = 3;
const TELEMETERED_STREAM_COLUMN: usize = 4;
const RECOVERED_PARAMETER_COLUMN: usize = 5;
const TELEMETERED_PARAMETER_COLUMN: usize = 6;

/// Checks for one acquisition method of one test row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodAvailability {
    pub stream_available: bool,
    pub parameter_available: bool,
    pub parameter_in_stream: bool,
    /// Catalog stream carrying the parameter under this method.
    pub catalog_stream: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub recovered: MethodAvailability,
    pub telemetered: MethodAvailability,
    pub metadata_url: Option<String>,
}

impl AvailabilityResult {
    /// Cells in `RESULT_COLUMNS` order.
    pub fn cells(&self) -> Vec<String> {
        let flag = |value: bool| if value { "1" } else { "0" }.to_string();
        vec![
            flag(self.recovered.stream_available),
            flag(self.recovered.parameter_available),
            flag(self.recovered.parameter_in_stream),
            flag(self.telemetered.stream_available),
            flag(self.telemetered.parameter_available),
            flag(self.telemetered.parameter_in_stream),
            self.recovered.catalog_stream.clone().unwrap_or_default(),
            self.telemetered.catalog_stream.clone().unwrap_or_default(),
            self.metadata_url.clone().unwrap_or_default(),
        ]
    }
}

/// Stream records that carry `parameter`, optionally only under `method`.
pub fn parameter_streams<'a>(
    metadata: &'a SensorMetadata,
    parameter: &str,
    method: Option<&str>,
) -> Vec<&'a StreamMetadata> {
    let mut streams = Vec::new();
    for record in metadata
        .parameters
        .iter()
        .filter(|record| record.particle_key == parameter)
    {
        streams.extend(metadata.times.iter().filter(|times| {
            times.stream == record.stream && method.is_none_or(|method| times.method == method)
        }));
    }
    streams
}

/// Evaluates the stream and parameter columns of one method independently.
pub fn check_method(
    metadata: &SensorMetadata,
    stream: &str,
    parameter: &str,
    method: &str,
) -> MethodAvailability {
    let mut result = MethodAvailability::default();
    if !stream.is_empty() {
        result.stream_available = metadata.times.iter().any(|times| times.stream == stream);
    }
    if parameter.is_empty() {
        return result;
    }
    let Some(record) = metadata
        .parameters
        .iter()
        .find(|record| record.particle_key == parameter)
    else {
        return result;
    };
    result.parameter_available = true;
    result.parameter_in_stream = !stream.is_empty() && record.stream == stream;
    result.catalog_stream = parameter_streams(metadata, parameter, Some(method))
        .first()
        .map(|times| times.stream.clone());
    result
}

/// Runs availability checks row by row, fetching metadata once per
/// reference designator.
pub struct AvailabilityTester<'a, T: Transport> {
    client: &'a CatalogClient<T>,
    cache: HashMap<ReferenceDesignator, Option<SensorMetadata>>,
}

impl<'a, T: Transport> AvailabilityTester<'a, T> {
    pub fn new(client: &'a CatalogClient<T>) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    pub fn test_row(&mut self, row: &[String]) -> AvailabilityResult {
        let cell = |index: usize| row.get(index).map(|value| value.trim()).unwrap_or("");
        let refdes = match cell(REFDES_COLUMN).parse::<ReferenceDesignator>() {
            Ok(refdes) => refdes,
            Err(err) => {
                warn!(stage = %Stage::Metadata, "{err}");
                return AvailabilityResult::default();
            }
        };

        let client = self.client;
        let metadata = self.cache.entry(refdes.clone()).or_insert_with(|| {
            info!(stage = %Stage::Metadata, id = %refdes, "fetching metadata");
            client.sensor_metadata(refdes.subsite(), refdes.node(), refdes.sensor())
        });
        let Some(metadata) = metadata.as_ref() else {
            return AvailabilityResult::default();
        };

        let recovered = check_method(
            metadata,
            cell(RECOVERED_STREAM_COLUMN),
            cell(RECOVERED_PARAMETER_COLUMN),
            RECOVERED,
        );
        let telemetered = check_method(
            metadata,
            cell(TELEMETERED_STREAM_COLUMN),
            cell(TELEMETERED_PARAMETER_COLUMN),
            TELEMETERED,
        );
        AvailabilityResult {
            recovered,
            telemetered,
            metadata_url: Some(metadata_url(
                client.endpoint(),
                refdes.subsite(),
                refdes.node(),
                refdes.sensor(),
            )),
        }
    }

    /// Copies the input table to `output` with the result columns appended.
    /// Returns the number of rows tested.
    pub fn run<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<usize, UframeError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(output);

        let mut headers = reader
            .headers()
            .map_err(|err| UframeError::Csv(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        headers.extend(RESULT_COLUMNS.iter().map(|column| column.to_string()));
        writer
            .write_record(&headers)
            .map_err(|err| UframeError::Csv(err.to_string()))?;

        let mut count = 0;
        for record in reader.records() {
            let record = record.map_err(|err| UframeError::Csv(err.to_string()))?;
            let mut row = record.iter().map(str::to_string).collect::<Vec<_>>();
            let result = self.test_row(&row);
            row.extend(result.cells());
            writer
                .write_record(&row)
                .map_err(|err| UframeError::Csv(err.to_string()))?;
            count += 1;
        }
        writer
            .flush()
            .map_err(|err| UframeError::Filesystem(err.to_string()))?;
        Ok(count)
    }
}

/// `<stem>-test_results.<ext>` beside the input file.
pub fn default_results_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}-test_results.{}", ext.to_string_lossy()),
        None => format!("{stem}-test_results"),
    };
    input.with_file_name(name)
}

impl<T: Transport> CatalogClient<T> {
    /// Tests every row of the CSV at `input` and writes the results table.
    pub fn test_availability(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<PathBuf, UframeError> {
        let source = File::open(input)
            .map_err(|err| UframeError::Filesystem(format!("open {}: {err}", input.display())))?;
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_results_path(input));
        let sink = File::create(&output)
            .map_err(|err| UframeError::Filesystem(format!("create {}: {err}", output.display())))?;
        let rows = AvailabilityTester::new(self).run(source, sink)?;
        info!(rows, path = %output.display(), "availability results written");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> SensorMetadata {
        serde_json::from_str(
            r#"{
                "parameters": [
                    {"particleKey": "pressure", "stream": "A_sample_recovered"},
                    {"particleKey": "temperature", "stream": "A_sample"}
                ],
                "times": [
                    {"stream": "A_sample", "method": "telemetered", "endTime": "2015-06-01T00:00:00.000Z"},
                    {"stream": "A_sample_recovered", "method": "recovered", "endTime": "2015-05-01T00:00:00.000Z"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn recovered_checks_use_recovered_method() {
        let result = check_method(&metadata(), "A_sample_recovered", "pressure", RECOVERED);
        assert!(result.stream_available);
        assert!(result.parameter_available);
        assert!(result.parameter_in_stream);
        assert_eq!(result.catalog_stream.as_deref(), Some("A_sample_recovered"));
    }

    #[test]
    fn parameter_in_other_stream_is_flagged() {
        let result = check_method(&metadata(), "A_sample", "pressure", TELEMETERED);
        assert!(result.stream_available);
        assert!(result.parameter_available);
        assert!(!result.parameter_in_stream);
        assert_eq!(result.catalog_stream, None);
    }

    #[test]
    fn parameter_without_stream_still_resolves_catalog_stream() {
        let result = check_method(&metadata(), "", "temperature", TELEMETERED);
        assert!(!result.stream_available);
        assert!(result.parameter_available);
        assert_eq!(result.catalog_stream.as_deref(), Some("A_sample"));
    }

    #[test]
    fn results_path_sits_beside_input() {
        let path = default_results_path(Path::new("/tmp/tests/cases.csv"));
        assert_eq!(path, PathBuf::from("/tmp/tests/cases-test_results.csv"));
    }
}
