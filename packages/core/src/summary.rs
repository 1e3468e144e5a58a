//! Accuracy summary.
//!
//! Classifies each forecast against the realized percentile band of its
//! block: above the high bound is overpaid, below the low bound is
//! underpaid, anything else is within range. Comparisons are strict, so an
//! estimate sitting exactly on a bound counts as within range.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::Diagnostic;
use crate::record::{format_timestamp, ForecastRecord};
use crate::schema::DatasetSchema;
use crate::window::FilteredView;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("record at block {block_height} is missing field `{field}`")]
    MissingField { block_height: u64, field: String },
}

/// Count and share of one category, the share in percent rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Share {
    pub count: usize,
    pub percentage: f64,
}

impl Share {
    fn of(count: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        };
        Self { count, percentage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub overpaid: Share,
    pub underpaid: Share,
    pub within_range: Share,
}

impl Summary {
    pub fn categories(&self) -> [(Category, Share); 3] {
        [
            (Category::Overpaid, self.overpaid),
            (Category::Underpaid, self.underpaid),
            (Category::WithinRange, self.within_range),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Overpaid,
    Underpaid,
    WithinRange,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Overpaid => write!(f, "overpaid"),
            Category::Underpaid => write!(f, "underpaid"),
            Category::WithinRange => write!(f, "within range"),
        }
    }
}

/// Classify `records[estimate_key]` against `[records[low_key], records[high_key]]`.
pub fn summarize<'r, I>(
    records: I,
    estimate_key: &str,
    low_key: &str,
    high_key: &str,
) -> Result<Summary, ReportError>
where
    I: IntoIterator<Item = &'r ForecastRecord>,
{
    let mut total = 0usize;
    let mut overpaid = 0usize;
    let mut underpaid = 0usize;

    for record in records {
        let estimate = field(record, estimate_key)?;
        let low = field(record, low_key)?;
        let high = field(record, high_key)?;

        total += 1;
        if estimate > high {
            overpaid += 1;
        } else if estimate < low {
            underpaid += 1;
        }
    }

    Ok(Summary {
        total,
        overpaid: Share::of(overpaid, total),
        underpaid: Share::of(underpaid, total),
        within_range: Share::of(total - overpaid - underpaid, total),
    })
}

fn field(record: &ForecastRecord, key: &str) -> Result<u64, ReportError> {
    record.fee(key).ok_or_else(|| ReportError::MissingField {
        block_height: record.block_height,
        field: key.to_string(),
    })
}

/// Time and height range covered by a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHeader {
    pub total: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_block: u64,
    pub end_block: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateSummary {
    pub key: String,
    pub label: String,
    pub summary: Summary,
}

/// Full accuracy report for one (optionally forecaster-filtered) dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub forecaster: Option<String>,
    pub header: ReportHeader,
    pub estimates: Vec<EstimateSummary>,
}

/// Build the report for `view`, one summary per estimate field of `schema`.
pub fn build_report(
    view: &FilteredView<'_>,
    schema: &DatasetSchema,
    forecaster: Option<&str>,
) -> Result<Report, Diagnostic> {
    let (first, last) = match (view.first(), view.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(Diagnostic::empty_dataset(forecaster)),
    };

    let header = ReportHeader {
        total: view.len(),
        start_time: first.timestamp,
        end_time: last.timestamp,
        start_block: schema.height_semantics.reported_height(first.block_height),
        end_block: schema.height_semantics.reported_height(last.block_height),
    };

    let estimates = schema
        .estimates
        .iter()
        .map(|field| -> Result<EstimateSummary, ReportError> {
            let summary = summarize(
                view.iter(),
                &field.key,
                &schema.band_low.key,
                &schema.band_high.key,
            )?;
            Ok(EstimateSummary {
                key: field.key.clone(),
                label: field.label.clone(),
                summary,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    Ok(Report {
        forecaster: forecaster.map(str::to_string),
        header,
        estimates,
    })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(forecaster) = &self.forecaster {
            writeln!(f, "Forecaster: {}", forecaster)?;
        }
        writeln!(f, "Total estimates: {}", self.header.total)?;
        writeln!(f, "Start time: {}", format_timestamp(&self.header.start_time))?;
        writeln!(f, "End time: {}", format_timestamp(&self.header.end_time))?;
        writeln!(f, "Start block height: {}", self.header.start_block)?;
        write!(f, "End block height: {}", self.header.end_block)?;

        for estimate in &self.estimates {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "{}:", estimate.label)?;
            for (category, share) in estimate.summary.categories() {
                writeln!(f)?;
                write!(
                    f,
                    "{} estimates {} {:.2}% of the total estimates",
                    share.count, category, share.percentage
                )?;
            }
        }
        Ok(())
    }
}
