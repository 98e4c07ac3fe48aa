use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::StreamMetadata;
use crate::error::UframeError;
use crate::fetch::FetchOutcome;
use crate::stream_map::StreamMapEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        Self::write(io::stdout().lock(), value)
    }

    pub fn write<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Column selection for stream map tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMapColumns {
    pub all: bool,
    pub particles: bool,
    pub urls: bool,
}

impl StreamMapColumns {
    pub fn names(&self) -> Vec<&'static str> {
        if self.all {
            return vec![
                "parameter",
                "method",
                "stream",
                "reference_designator",
                "pdId",
                "units",
                "beginTime",
                "endTime",
                "num_records",
                "fillValue",
                "type",
                "unsigned",
                "metadata_url",
            ];
        }
        let mut names = vec!["parameter", "method", "stream", "calculated", "reference_designator"];
        if self.particles {
            names.push("num_records");
        }
        if self.urls {
            names.push("metadata_url");
        }
        names
    }
}

pub struct CsvOutput;

impl CsvOutput {
    /// `request_time,code,reason,url` per outcome, or the bare URL when
    /// nothing was requested.
    pub fn write_outcomes<W: Write>(
        writer: W,
        outcomes: &[FetchOutcome],
        url_only: bool,
    ) -> Result<(), UframeError> {
        let mut writer = csv_writer(writer);
        for outcome in outcomes {
            let record = if url_only {
                vec![outcome.url.clone()]
            } else {
                vec![
                    outcome.request_time.clone(),
                    outcome.code.to_string(),
                    outcome.reason.clone().unwrap_or_default(),
                    outcome.url.clone(),
                ]
            };
            write_record(&mut writer, &record)?;
        }
        finish(writer)
    }

    pub fn write_stream_map<W: Write>(
        writer: W,
        entries: &[StreamMapEntry],
        columns: StreamMapColumns,
    ) -> Result<(), UframeError> {
        let names = columns.names();
        let mut writer = csv_writer(writer);
        write_record(&mut writer, &names)?;
        for entry in entries {
            let row = names
                .iter()
                .map(|name| stream_map_cell(entry, name))
                .collect::<Vec<_>>();
            write_record(&mut writer, &row)?;
        }
        finish(writer)
    }

    pub fn write_stream_records<W: Write>(
        writer: W,
        records: &[StreamMetadata],
    ) -> Result<(), UframeError> {
        let mut writer = csv_writer(writer);
        write_record(
            &mut writer,
            &["stream", "method", "sensor", "beginTime", "endTime", "count"],
        )?;
        for record in records {
            write_record(
                &mut writer,
                &[
                    record.stream.clone(),
                    record.method.clone(),
                    record.sensor().unwrap_or_default().to_string(),
                    record.begin_time.clone(),
                    record.end_time.clone(),
                    record.count().map(|count| count.to_string()).unwrap_or_default(),
                ],
            )?;
        }
        finish(writer)
    }
}

/// Reads a headed CSV table into `D`, failing up front when any of
/// `required` is absent from the header.
pub fn read_rows<D: DeserializeOwned, R: Read>(
    input: R,
    required: &[&str],
) -> Result<Vec<D>, UframeError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let headers = reader
        .headers()
        .map_err(|err| UframeError::Csv(err.to_string()))?
        .clone();
    if let Some(missing) = required
        .iter()
        .find(|column| !headers.iter().any(|header| header == **column))
    {
        return Err(UframeError::MissingColumn(missing.to_string()));
    }
    reader
        .deserialize()
        .map(|row| row.map_err(|err| UframeError::Csv(err.to_string())))
        .collect()
}

fn stream_map_cell(entry: &StreamMapEntry, column: &str) -> String {
    let parameter = &entry.parameter;
    let stream = &entry.stream;
    match column {
        "parameter" => parameter.particle_key.clone(),
        "method" => stream.method.clone(),
        "stream" => stream.stream.clone(),
        "calculated" => if entry.is_calculated() { "1" } else { "0" }.to_string(),
        "reference_designator" => stream.sensor().unwrap_or_default().to_string(),
        "pdId" => parameter.pd_id.clone(),
        "units" => parameter.units.clone(),
        "beginTime" => stream.begin_time.clone(),
        "endTime" => stream.end_time.clone(),
        "num_records" => stream.count().map(|count| count.to_string()).unwrap_or_default(),
        "metadata_url" => entry.metadata_url.clone(),
        other => extra_cell(&parameter.extra, other),
    }
}

fn extra_cell(extra: &Map<String, Value>, key: &str) -> String {
    match extra.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().flexible(true).from_writer(writer)
}

fn write_record<W: Write, I, F>(writer: &mut csv::Writer<W>, record: I) -> Result<(), UframeError>
where
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    writer
        .write_record(record)
        .map_err(|err| UframeError::Csv(err.to_string()))
}

fn finish<W: Write>(mut writer: csv::Writer<W>) -> Result<(), UframeError> {
    writer
        .flush()
        .map_err(|err| UframeError::Filesystem(err.to_string()))
}
