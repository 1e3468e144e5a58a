//! Error types shared across the crate.
//!
//! [`Diagnostic`] is the soft-failure type every pipeline stage returns:
//! a bad window or an empty dataset is reported and the run continues.
//! [`AppError`] covers the few failures that stop the binary outright.

use thiserror::Error;

use crate::chart::ChartError;
use crate::config::ConfigError;
use crate::loader::LoadError;
use crate::summary::ReportError;

/// Recoverable failure reported by the window filter or reporter. Load
/// failures never get here: [`crate::loader::load`] logs them and yields
/// an empty sequence, which surfaces as `DataNotProvided`.
#[derive(Error, Debug)]
pub enum Diagnostic {
    #[error("{unit} exceeded maximum threshold of {max} {unit}")]
    ExceededMaxSpan {
        requested: i64,
        max: u64,
        unit: &'static str,
    },

    #[error("Invalid range: start {start}, end {end} (expected 0 <= start <= end < {limit})")]
    InvalidRange { start: i64, end: i64, limit: u64 },

    #[error("Data not provided")]
    DataNotProvided,

    #[error("No records available for {scope}")]
    EmptyDataset { scope: String },

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl Diagnostic {
    pub fn empty_dataset(forecaster: Option<&str>) -> Self {
        let scope = match forecaster {
            Some(name) => format!("forecaster `{}`", name),
            None => "the dataset".to_string(),
        };
        Self::EmptyDataset { scope }
    }
}

/// Unified application error for the binary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[source] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeded_span_message_names_the_threshold() {
        let diag = Diagnostic::ExceededMaxSpan {
            requested: 250,
            max: 200,
            unit: "Blocks",
        };
        assert_eq!(
            diag.to_string(),
            "Blocks exceeded maximum threshold of 200 Blocks"
        );
    }

    #[test]
    fn invalid_range_message_starts_with_invalid_range() {
        let diag = Diagnostic::InvalidRange {
            start: -1,
            end: 50,
            limit: 102,
        };
        assert!(diag.to_string().starts_with("Invalid range"));
    }

    #[test]
    fn empty_dataset_scope_mentions_forecaster() {
        let diag = Diagnostic::empty_dataset(Some("Mempool Forecast"));
        assert_eq!(
            diag.to_string(),
            "No records available for forecaster `Mempool Forecast`"
        );
        let diag = Diagnostic::empty_dataset(None);
        assert_eq!(diag.to_string(), "No records available for the dataset");
    }
}
