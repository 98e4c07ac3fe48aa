use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum UframeError {
    #[error("invalid relative delta type: {0} (expected years, months, weeks, days, hours, minutes or seconds)")]
    InvalidDeltaType(String),

    #[error("no {0} identifier specified")]
    MissingIdentifier(&'static str),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid metadata endTime (year {year} precedes 2000): {value}")]
    SentinelTimestamp { year: i32, value: String },

    #[error("invalid reference designator: {0}")]
    InvalidReferenceDesignator(String),

    #[error("invalid catalog endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode catalog response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("array {0} does not exist in uFrame")]
    ArrayNotFound(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("input csv file missing required column: {0}")]
    MissingColumn(String),
}
