use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint};

use crate::config::Config;
use crate::loader::LoadError;
use crate::schema::{DatasetSchema, HeightSemantics};
use crate::window::{BlockWindow, WindowMode};

/// Fee forecast tracker CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "fee-forecast-tracker",
    version,
    about = "Compare fee-rate forecasts against realized block fee-rate percentiles"
)]
pub struct Cli {
    /// JSON file of forecast records
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// First block height of the chart window (a position with --positional)
    #[arg(long, requires = "end", allow_negative_numbers = true)]
    pub start: Option<i64>,

    /// Last block height of the chart window, inclusive
    #[arg(long, requires = "start", allow_negative_numbers = true)]
    pub end: Option<i64>,

    /// Only use records from this forecaster
    #[arg(long)]
    pub forecaster: Option<String>,

    /// Logarithmic y-axis
    #[arg(long)]
    pub log_scale: bool,

    /// Dataset layout of the input file
    #[arg(long, value_enum, default_value_t = SchemaPreset::BlockPolicy)]
    pub schema: SchemaPreset,

    /// Use bitcoind's thresholds instead of block percentiles as the band
    /// (forecasters schema only)
    #[arg(long)]
    pub bitcoind_threshold: bool,

    /// Custom schema descriptor (JSON); takes precedence over --schema
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub schema_file: Option<PathBuf>,

    /// Treat --start/--end as positions in the record sequence
    #[arg(long)]
    pub positional: bool,

    /// What the stored block height refers to
    #[arg(long, value_enum)]
    pub height_semantics: Option<HeightArg>,

    /// Chart output path (.png or .svg)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Skip the chart
    #[arg(long)]
    pub no_plot: bool,

    /// Skip the accuracy summary
    #[arg(long)]
    pub no_summary: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaPreset {
    /// Mempool estimate vs estimatesmartfee, 5th-75th percentile band
    BlockPolicy,
    /// estimatesmartfee conservative vs economic, 5th-50th percentile band
    SmartFee,
    /// Interleaved per-forecaster low/high estimates
    Forecasters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeightArg {
    /// Height at which the estimate was made; reported one lower
    Estimation,
    /// Height the estimate targets; reported as stored
    Target,
}

impl From<HeightArg> for HeightSemantics {
    fn from(arg: HeightArg) -> Self {
        match arg {
            HeightArg::Estimation => HeightSemantics::EstimationBlock,
            HeightArg::Target => HeightSemantics::TargetBlock,
        }
    }
}

impl Cli {
    /// Resolve the dataset schema from the preset or descriptor file.
    pub fn dataset_schema(&self) -> Result<DatasetSchema, LoadError> {
        let mut schema = match &self.schema_file {
            Some(path) => DatasetSchema::from_file(path)?,
            None => match self.schema {
                SchemaPreset::BlockPolicy => DatasetSchema::block_policy(),
                SchemaPreset::SmartFee => DatasetSchema::smart_fee(),
                SchemaPreset::Forecasters => DatasetSchema::forecasters(self.bitcoind_threshold),
            },
        };

        if let Some(semantics) = self.height_semantics {
            schema.height_semantics = semantics.into();
        }
        Ok(schema)
    }

    pub fn window(&self) -> Option<BlockWindow> {
        self.start
            .zip(self.end)
            .map(|(start, end)| BlockWindow::new(start, end))
    }

    pub fn window_mode(&self) -> WindowMode {
        if self.positional {
            WindowMode::Position
        } else {
            WindowMode::BlockHeight
        }
    }

    /// Command-line flags win over environment configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.chart_output = output.clone();
        }
    }
}
