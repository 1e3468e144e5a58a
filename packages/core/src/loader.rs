//! Record loader.
//!
//! Reads a JSON array of forecast objects and normalizes it against a
//! [`DatasetSchema`]. Numeric fields may arrive as numbers or numeric
//! strings; every one is coerced to a float and truncated to an integer,
//! after sat/kvB fields have been divided by 1000.
//!
//! [`load`] is the soft boundary: any failure is logged with the path and
//! cause, and an empty sequence is returned in its place.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::record::{parse_timestamp, ForecastRecord};
use crate::schema::DatasetSchema;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of records")]
    NotAnArray,

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index} is missing field `{field}`")]
    MissingField { index: usize, field: String },

    #[error("record {index} has invalid value for `{field}`: {value}")]
    InvalidField {
        index: usize,
        field: String,
        value: String,
    },

    #[error("record {index} has unparseable timestamp `{value}`")]
    InvalidTimestamp { index: usize, value: String },
}

/// Load and normalize records from `path`, returning an empty sequence on
/// any failure.
pub fn load(path: &Path, schema: &DatasetSchema) -> Vec<ForecastRecord> {
    match try_load(path, schema) {
        Ok(records) => {
            info!(
                "Loaded {} records from {} (schema: {})",
                records.len(),
                path.display(),
                schema.name
            );
            records
        }
        Err(err) => {
            error!("Failed to load estimates data from {}: {}", path.display(), err);
            Vec::new()
        }
    }
}

/// Fallible counterpart of [`load`].
pub fn try_load(path: &Path, schema: &DatasetSchema) -> Result<Vec<ForecastRecord>, LoadError> {
    let contents = fs::read_to_string(path)?;
    parse_records(&contents, schema)
}

/// Parse and normalize a JSON document already held in memory.
pub fn parse_records(json: &str, schema: &DatasetSchema) -> Result<Vec<ForecastRecord>, LoadError> {
    let document: Value = serde_json::from_str(json)?;
    let entries = document.as_array().ok_or(LoadError::NotAnArray)?;

    let mut records = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    for (index, entry) in entries.iter().enumerate() {
        let object = match entry.as_object() {
            Some(object) => object,
            None if schema.is_per_forecaster() => {
                dropped += 1;
                continue;
            }
            None => return Err(LoadError::NotAnObject { index }),
        };

        // Interleaved files carry other forecasters' schemas too.
        if schema.is_per_forecaster() && !has_required_keys(object, schema) {
            dropped += 1;
            continue;
        }

        records.push(parse_record(index, object, schema)?);
    }

    if dropped > 0 {
        debug!(
            "Dropped {} records not matching schema `{}`",
            dropped, schema.name
        );
    }

    if let Some(index) = first_out_of_order(&records) {
        warn!(
            "Records are not ordered by block height (first regression at position {})",
            index
        );
    }

    Ok(records)
}

fn has_required_keys(object: &Map<String, Value>, schema: &DatasetSchema) -> bool {
    schema
        .required_keys()
        .all(|key| object.get(key).map_or(false, |value| !value.is_null()))
}

fn parse_record(
    index: usize,
    object: &Map<String, Value>,
    schema: &DatasetSchema,
) -> Result<ForecastRecord, LoadError> {
    let block_height = required(index, object, &schema.block_height_key)
        .and_then(|value| coerce_non_negative(index, &schema.block_height_key, value))?
        .trunc() as u64;

    let raw_timestamp = required(index, object, &schema.timestamp_key)?;
    let timestamp = raw_timestamp
        .as_str()
        .and_then(parse_timestamp)
        .ok_or_else(|| LoadError::InvalidTimestamp {
            index,
            value: raw_timestamp.to_string(),
        })?;

    let forecaster = match schema.forecaster_key.as_deref() {
        Some(key) => {
            let value = required(index, object, key)?;
            let tag = value.as_str().ok_or_else(|| LoadError::InvalidField {
                index,
                field: key.to_string(),
                value: value.to_string(),
            })?;
            Some(tag.to_string())
        }
        None => None,
    };

    let mut fees = BTreeMap::new();
    for field in schema.fee_fields() {
        let value = required(index, object, &field.key)?;
        let raw = coerce_non_negative(index, &field.key, value)?;
        fees.insert(field.key.clone(), field.unit.to_sat_per_vb(raw).trunc() as u64);
    }

    Ok(ForecastRecord {
        timestamp,
        block_height,
        forecaster,
        fees,
    })
}

fn required<'v>(
    index: usize,
    object: &'v Map<String, Value>,
    key: &str,
) -> Result<&'v Value, LoadError> {
    object
        .get(key)
        .filter(|value| !value.is_null())
        .ok_or_else(|| LoadError::MissingField {
            index,
            field: key.to_string(),
        })
}

/// Read a number or numeric string as a float.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn coerce_non_negative(index: usize, field: &str, value: &Value) -> Result<f64, LoadError> {
    let invalid = || LoadError::InvalidField {
        index,
        field: field.to_string(),
        value: value.to_string(),
    };

    let number = coerce_number(value).ok_or_else(invalid)?;
    if number < 0.0 {
        return Err(invalid());
    }
    Ok(number)
}

fn first_out_of_order(records: &[ForecastRecord]) -> Option<usize> {
    records
        .windows(2)
        .position(|pair| pair[1].block_height < pair[0].block_height)
        .map(|position| position + 1)
}
