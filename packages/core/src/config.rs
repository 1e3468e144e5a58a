use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_MAX_BLOCK_SPAN: u64 = 200;
pub const DEFAULT_MAX_POSITION_SPAN: u64 = 2000;
pub const DEFAULT_CHART_OUTPUT: &str = "fee_estimates.png";
pub const DEFAULT_CHART_SIZE: u32 = 1500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be a valid positive number, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub max_block_span: u64,
    pub max_position_span: u64,
    pub chart_output: PathBuf,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_block_span: DEFAULT_MAX_BLOCK_SPAN,
            max_position_span: DEFAULT_MAX_POSITION_SPAN,
            chart_output: PathBuf::from(DEFAULT_CHART_OUTPUT),
            chart_width: DEFAULT_CHART_SIZE,
            chart_height: DEFAULT_CHART_SIZE,
        }
    }
}

impl Config {
    /// Build the configuration from `FEE_TRACKER_*` environment variables.
    /// Every variable is optional; unset ones keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_block_span =
            parse_number(&lookup, "FEE_TRACKER_MAX_BLOCK_SPAN")?.unwrap_or(defaults.max_block_span);

        let max_position_span = parse_number(&lookup, "FEE_TRACKER_MAX_POSITION_SPAN")?
            .unwrap_or(defaults.max_position_span);

        let chart_output = lookup("FEE_TRACKER_CHART_OUTPUT")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.chart_output);

        let chart_width = parse_number::<u32, _>(&lookup, "FEE_TRACKER_CHART_WIDTH")?
            .unwrap_or(defaults.chart_width);

        let chart_height = parse_number::<u32, _>(&lookup, "FEE_TRACKER_CHART_HEIGHT")?
            .unwrap_or(defaults.chart_height);

        Ok(Self {
            max_block_span,
            max_position_span,
            chart_output,
            chart_width,
            chart_height,
        })
    }
}

fn parse_number<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value != T::default() => Ok(Some(value)),
            _ => Err(ConfigError::InvalidNumber { key, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.max_block_span, 200);
        assert_eq!(config.max_position_span, 2000);
        assert_eq!(config.chart_output, PathBuf::from("fee_estimates.png"));
        assert_eq!(config.chart_width, 1500);
    }

    #[test]
    fn env_values_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("FEE_TRACKER_MAX_BLOCK_SPAN", "50"),
            ("FEE_TRACKER_CHART_OUTPUT", "out.svg"),
            ("FEE_TRACKER_CHART_HEIGHT", "600"),
        ]))
        .unwrap();
        assert_eq!(config.max_block_span, 50);
        assert_eq!(config.chart_output, PathBuf::from("out.svg"));
        assert_eq!(config.chart_height, 600);
        assert_eq!(config.chart_width, 1500);
    }

    #[test]
    fn non_numeric_span_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("FEE_TRACKER_MAX_BLOCK_SPAN", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("FEE_TRACKER_MAX_BLOCK_SPAN"));
    }

    #[test]
    fn zero_chart_width_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("FEE_TRACKER_CHART_WIDTH", "0")])).is_err());
    }
}
