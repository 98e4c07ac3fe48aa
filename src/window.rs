use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDateTime, TimeDelta, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::UframeError;

/// Metadata end times before this year are catalog placeholders.
pub const MIN_VALID_YEAR: i32 = 2000;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const COMPACT_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeltaType {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeltaType::Years => "years",
            DeltaType::Months => "months",
            DeltaType::Weeks => "weeks",
            DeltaType::Days => "days",
            DeltaType::Hours => "hours",
            DeltaType::Minutes => "minutes",
            DeltaType::Seconds => "seconds",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DeltaType {
    type Err = UframeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "years" => Ok(DeltaType::Years),
            "months" => Ok(DeltaType::Months),
            "weeks" => Ok(DeltaType::Weeks),
            "days" => Ok(DeltaType::Days),
            "hours" => Ok(DeltaType::Hours),
            "minutes" => Ok(DeltaType::Minutes),
            "seconds" => Ok(DeltaType::Seconds),
            _ => Err(UframeError::InvalidDeltaType(value.to_string())),
        }
    }
}

/// Relative offset subtracted from a stream's end time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub kind: DeltaType,
    pub value: u32,
}

impl Delta {
    pub fn new(kind: DeltaType, value: u32) -> Self {
        Self { kind, value }
    }

    /// Calendar-aware subtraction: month and year steps clamp to the end of
    /// shorter months instead of using a fixed duration.
    pub fn subtract_from(&self, end: DateTime<Utc>) -> Result<DateTime<Utc>, UframeError> {
        let value = i64::from(self.value);
        let begin = match self.kind {
            DeltaType::Years => self
                .value
                .checked_mul(12)
                .and_then(|months| end.checked_sub_months(Months::new(months))),
            DeltaType::Months => end.checked_sub_months(Months::new(self.value)),
            DeltaType::Weeks => TimeDelta::try_weeks(value).and_then(|d| end.checked_sub_signed(d)),
            DeltaType::Days => TimeDelta::try_days(value).and_then(|d| end.checked_sub_signed(d)),
            DeltaType::Hours => TimeDelta::try_hours(value).and_then(|d| end.checked_sub_signed(d)),
            DeltaType::Minutes => {
                TimeDelta::try_minutes(value).and_then(|d| end.checked_sub_signed(d))
            }
            DeltaType::Seconds => {
                TimeDelta::try_seconds(value).and_then(|d| end.checked_sub_signed(d))
            }
        };
        begin.ok_or_else(|| {
            UframeError::InvalidTimestamp(format!("{} {} before {}", self.value, self.kind, format_iso(&end)))
        })
    }
}

impl Default for Delta {
    fn default() -> Self {
        Self::new(DeltaType::Days, 1)
    }
}

/// Begin/end bounds of one stream request.
///
/// `end_iso` is the catalog's own string, passed through untouched; `begin_iso`
/// is derived and always carries microseconds and a `Z` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub begin_iso: String,
    pub end_iso: String,
}

pub fn resolve_window(end_iso: &str, delta: Delta) -> Result<TimeWindow, UframeError> {
    let end = parse_timestamp(end_iso)?;
    if end.year() < MIN_VALID_YEAR {
        return Err(UframeError::SentinelTimestamp {
            year: end.year(),
            value: end_iso.to_string(),
        });
    }
    let begin = delta.subtract_from(end)?;
    Ok(TimeWindow {
        begin,
        end,
        begin_iso: format_iso(&begin),
        end_iso: end_iso.to_string(),
    })
}

/// Parses catalog timestamps; values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, UframeError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = trimmed.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| UframeError::InvalidTimestamp(value.to_string()))
}

pub fn format_iso(value: &DateTime<Utc>) -> String {
    value.format(ISO_FORMAT).to_string()
}

/// `YYYYMMDDTHHMMSS`, as used in downloaded file names.
pub fn format_compact(value: &DateTime<Utc>) -> String {
    value.format(COMPACT_FORMAT).to_string()
}
