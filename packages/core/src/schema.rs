//! Dataset schema descriptors.
//!
//! A [`DatasetSchema`] names every field a dataset variant carries, the unit
//! each fee field arrives in, whether records are tagged by forecaster, and
//! how `block_height` should be reported. One loader, filter and reporter
//! serve every variant by reading this descriptor.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::loader::LoadError;

/// Forecaster tags emitted by the fee-estimation harness.
pub const MEMPOOL_LAST_10_MIN_FORECAST: &str = "Mempool Last 10 min Forecast";
pub const MEMPOOL_FORECAST: &str = "Mempool Forecast";
pub const LAST_BLOCK_FORECAST: &str = "Last Block Forecast";
pub const BLOCK_FORECAST: &str = "Block Forecast";

pub const KNOWN_FORECASTERS: &[&str] = &[
    MEMPOOL_LAST_10_MIN_FORECAST,
    MEMPOOL_FORECAST,
    LAST_BLOCK_FORECAST,
    BLOCK_FORECAST,
];

/// Unit a raw fee field is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeUnit {
    /// sat/kvB, divided by 1000 on ingestion.
    SatPerKvb,
    /// sat/vB, kept as-is.
    SatPerVb,
}

impl FeeUnit {
    /// Convert a raw value into sat/vB, before truncation.
    pub fn to_sat_per_vb(self, raw: f64) -> f64 {
        match self {
            FeeUnit::SatPerKvb => raw / 1000.0,
            FeeUnit::SatPerVb => raw,
        }
    }
}

/// What a record's `block_height` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightSemantics {
    /// The block the estimate targets; reported unchanged.
    #[default]
    TargetBlock,
    /// The chain tip when the estimate was made; the targeted block is one lower.
    EstimationBlock,
}

impl HeightSemantics {
    /// Height reported in summaries for a stored `block_height`.
    pub fn reported_height(self, block_height: u64) -> u64 {
        match self {
            HeightSemantics::TargetBlock => block_height,
            HeightSemantics::EstimationBlock => block_height.saturating_sub(1),
        }
    }
}

/// One fee field of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeField {
    pub key: String,
    pub label: String,
    pub unit: FeeUnit,
}

impl FeeField {
    pub fn new(key: &str, label: &str, unit: FeeUnit) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            unit,
        }
    }
}

/// Chart text for a dataset variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLabels {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
    #[serde(default = "default_band_label")]
    pub band_label: String,
}

impl Default for ChartLabels {
    fn default() -> Self {
        Self {
            title: "Fee estimates against the block fee rate percentile band".to_string(),
            subtitle: None,
            x_label: default_x_label(),
            y_label: default_y_label(),
            band_label: default_band_label(),
        }
    }
}

fn default_x_label() -> String {
    "Block Height".to_string()
}

fn default_y_label() -> String {
    "Fee Estimates".to_string()
}

fn default_band_label() -> String {
    "Percentile Range".to_string()
}

fn default_block_height_key() -> String {
    "block_height".to_string()
}

fn default_timestamp_key() -> String {
    "timestamp".to_string()
}

/// Descriptor for one dataset variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub name: String,
    #[serde(default = "default_block_height_key")]
    pub block_height_key: String,
    #[serde(default = "default_timestamp_key")]
    pub timestamp_key: String,
    /// Key holding the forecaster tag; `Some` marks an interleaved,
    /// per-forecaster file.
    #[serde(default)]
    pub forecaster_key: Option<String>,
    pub estimates: Vec<FeeField>,
    pub band_low: FeeField,
    pub band_high: FeeField,
    #[serde(default)]
    pub height_semantics: HeightSemantics,
    #[serde(default)]
    pub chart: ChartLabels,
}

impl DatasetSchema {
    /// Mempool estimate vs `estimatesmartfee`, against the 5th-75th percentile band.
    pub fn block_policy() -> Self {
        Self {
            name: "block-policy".to_string(),
            block_height_key: default_block_height_key(),
            timestamp_key: default_timestamp_key(),
            forecaster_key: None,
            estimates: vec![
                FeeField::new("mempool_fee_rate_estimate", "Mempool Estimates", FeeUnit::SatPerKvb),
                FeeField::new(
                    "block_fee_rate_estimate",
                    "Block Policy Estimates",
                    FeeUnit::SatPerKvb,
                ),
            ],
            band_low: FeeField::new(".05", "5th percentile", FeeUnit::SatPerVb),
            band_high: FeeField::new(".75", "75th percentile", FeeUnit::SatPerVb),
            height_semantics: HeightSemantics::TargetBlock,
            chart: ChartLabels {
                title: concat!(
                    "Mempool fee estimate vs estimatesmartfee against the block ",
                    "5th percentile to 75th percentile fee rate"
                )
                .to_string(),
                subtitle: Some("With confirmation target 1".to_string()),
                ..ChartLabels::default()
            },
        }
    }

    /// `estimatesmartfee` conservative vs economic modes, against the 5th-50th band.
    pub fn smart_fee() -> Self {
        Self {
            name: "smart-fee".to_string(),
            block_height_key: default_block_height_key(),
            timestamp_key: default_timestamp_key(),
            forecaster_key: None,
            estimates: vec![
                FeeField::new("conservative", "Conservative Estimates", FeeUnit::SatPerKvb),
                FeeField::new("economic", "Economic Estimates", FeeUnit::SatPerKvb),
            ],
            band_low: FeeField::new(".05", "5th percentile", FeeUnit::SatPerVb),
            band_high: FeeField::new(".50", "50th percentile", FeeUnit::SatPerVb),
            height_semantics: HeightSemantics::EstimationBlock,
            chart: ChartLabels {
                title: concat!(
                    "estimatesmartfee conservative vs economic against the block ",
                    "5th percentile to 50th percentile fee rate"
                )
                .to_string(),
                ..ChartLabels::default()
            },
        }
    }

    /// Several forecasters interleaved in one file, each giving a low and a
    /// high priority estimate. With `bitcoind_threshold` the band comes from
    /// bitcoind's own thresholds (already sat/vB) instead of block
    /// percentiles.
    pub fn forecasters(bitcoind_threshold: bool) -> Self {
        let (band_low, band_high) = if bitcoind_threshold {
            (
                FeeField::new("low_threshold", "bitcoind low threshold", FeeUnit::SatPerVb),
                FeeField::new("high_threshold", "bitcoind high threshold", FeeUnit::SatPerVb),
            )
        } else {
            (
                FeeField::new(".05", "5th percentile", FeeUnit::SatPerVb),
                FeeField::new(".50", "50th percentile", FeeUnit::SatPerVb),
            )
        };

        Self {
            name: "forecasters".to_string(),
            block_height_key: default_block_height_key(),
            timestamp_key: default_timestamp_key(),
            forecaster_key: Some("forecaster".to_string()),
            estimates: vec![
                FeeField::new("low", "Low Priority Estimates", FeeUnit::SatPerKvb),
                FeeField::new("high", "High Priority Estimates", FeeUnit::SatPerKvb),
            ],
            band_low,
            band_high,
            height_semantics: HeightSemantics::EstimationBlock,
            chart: ChartLabels {
                title: "Forecaster low and high priority estimates against the block fee rate band"
                    .to_string(),
                ..ChartLabels::default()
            },
        }
    }

    /// Read a custom descriptor from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        let schema = serde_json::from_str(&contents)?;
        Ok(schema)
    }

    pub fn is_per_forecaster(&self) -> bool {
        self.forecaster_key.is_some()
    }

    /// Estimate fields followed by the two band fields.
    pub fn fee_fields(&self) -> impl Iterator<Item = &FeeField> {
        self.estimates
            .iter()
            .chain(std::iter::once(&self.band_low))
            .chain(std::iter::once(&self.band_high))
    }

    /// Every key a record must carry to belong to this schema.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        [self.block_height_key.as_str(), self.timestamp_key.as_str()]
            .into_iter()
            .chain(self.forecaster_key.as_deref())
            .chain(self.fee_fields().map(|field| field.key.as_str()))
    }
}
