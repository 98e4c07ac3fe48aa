use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::UframeError;

/// Records per request when a cap is requested without an explicit value.
pub const DEFAULT_RECORD_LIMIT: u32 = 10_000;

/// Shape reported by the catalog for calculated (derived) parameters.
pub const CALCULATED_SHAPE: &str = "FUNCTION";

/// Payload format requested from the stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Netcdf,
    Json,
}

impl FileFormat {
    /// Suffix of the `application/...` value sent in the `format` parameter.
    pub fn mime_suffix(self) -> &'static str {
        match self {
            FileFormat::Netcdf => "netcdf",
            FileFormat::Json => "json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Netcdf => "nc",
            FileFormat::Json => "json",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_suffix())
    }
}

/// Cap on the number of records the server returns for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLimit {
    Capped(u32),
    Unlimited,
}

impl RecordLimit {
    pub fn from_flag(limited: bool) -> Self {
        if limited {
            RecordLimit::Capped(DEFAULT_RECORD_LIMIT)
        } else {
            RecordLimit::Unlimited
        }
    }
}

impl Default for RecordLimit {
    fn default() -> Self {
        RecordLimit::Capped(DEFAULT_RECORD_LIMIT)
    }
}

impl fmt::Display for RecordLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLimit::Capped(limit) => write!(f, "{limit}"),
            RecordLimit::Unlimited => write!(f, "-1"),
        }
    }
}

/// Level of the inventory descent a diagnostic or skip belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Array,
    Platform,
    Sensor,
    Metadata,
    Stream,
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Array => "array",
            Stage::Platform => "platform",
            Stage::Sensor => "sensor",
            Stage::Metadata => "metadata",
            Stage::Stream => "stream",
            Stage::Fetch => "fetch",
        };
        write!(f, "{name}")
    }
}

/// Fully-qualified instrument name, `SITE-NODE-PORT-INSTRUMENT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceDesignator {
    subsite: String,
    node: String,
    sensor: String,
}

impl ReferenceDesignator {
    pub fn subsite(&self) -> &str {
        &self.subsite
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Sensor path segment, `PORT-INSTRUMENT`.
    pub fn sensor(&self) -> &str {
        &self.sensor
    }
}

impl fmt::Display for ReferenceDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.subsite, self.node, self.sensor)
    }
}

impl FromStr for ReferenceDesignator {
    type Err = UframeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tokens = value.trim().split('-').collect::<Vec<_>>();
        let is_valid = tokens.len() == 4
            && tokens
                .iter()
                .all(|token| !token.is_empty() && token.chars().all(|ch| ch.is_ascii_alphanumeric()));
        if !is_valid {
            return Err(UframeError::InvalidReferenceDesignator(value.to_string()));
        }
        Ok(Self {
            subsite: tokens[0].to_string(),
            node: tokens[1].to_string(),
            sensor: format!("{}-{}", tokens[2], tokens[3]),
        })
    }
}

/// One parameter (particle key) exposed by a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    pub particle_key: String,
    #[serde(default)]
    pub stream: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pd_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub units: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub shape: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParameterMetadata {
    pub fn is_calculated(&self) -> bool {
        self.shape == CALCULATED_SHAPE
    }
}

/// Time extent of one (stream, method) pair for a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    pub stream: String,
    pub method: String,
    #[serde(default)]
    pub begin_time: String,
    pub end_time: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamMetadata {
    /// Reference designator the catalog attaches to the record, if any.
    pub fn sensor(&self) -> Option<&str> {
        self.extra.get("sensor").and_then(Value::as_str)
    }

    pub fn count(&self) -> Option<u64> {
        self.extra.get("count").and_then(Value::as_u64)
    }
}

/// Response of the sensor metadata endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorMetadata {
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    #[serde(default)]
    pub times: Vec<StreamMetadata>,
}

impl SensorMetadata {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.times.is_empty()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(value) => value,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
