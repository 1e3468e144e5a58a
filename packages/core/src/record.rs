//! Normalized forecast records.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Format used when timestamps are printed in reports.
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// One forecast observation, with every fee field already in sat/vB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub timestamp: DateTime<Utc>,
    pub block_height: u64,
    pub forecaster: Option<String>,
    /// Fee fields keyed by their name in the source file.
    pub fees: BTreeMap<String, u64>,
}

impl ForecastRecord {
    pub fn fee(&self, key: &str) -> Option<u64> {
        self.fees.get(key).copied()
    }

    pub fn is_from(&self, forecaster: &str) -> bool {
        self.forecaster.as_deref() == Some(forecaster)
    }
}

/// Parse an ISO-8601 timestamp. Offsets are honoured; timestamps without one
/// are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Second-precision rendering used by the summary header.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(REPORT_TIME_FORMAT).to_string()
}
