//! Fee forecast reporter - ties the loader, window filter, chart renderer
//! and summary together for one dataset schema.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::chart::{Band, ChartData, ChartOptions, ChartRenderer, Series};
use crate::config::Config;
use crate::error::Diagnostic;
use crate::loader;
use crate::record::ForecastRecord;
use crate::schema::{DatasetSchema, FeeField};
use crate::summary::{build_report, Report, ReportError};
use crate::window::{by_forecaster, select, BlockWindow, FilteredView, WindowLimits, WindowMode};

/// Parameters of one plot call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotRequest<'a> {
    pub window: BlockWindow,
    pub forecaster: Option<&'a str>,
    pub mode: WindowMode,
    pub log_y: bool,
}

impl<'a> PlotRequest<'a> {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            window: BlockWindow::new(start, end),
            forecaster: None,
            mode: WindowMode::BlockHeight,
            log_y: false,
        }
    }

    pub fn forecaster(mut self, forecaster: Option<&'a str>) -> Self {
        self.forecaster = forecaster;
        self
    }

    pub fn mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn log_y(mut self, log_y: bool) -> Self {
        self.log_y = log_y;
        self
    }
}

/// Report pipeline for one dataset schema.
pub struct FeeReporter<R> {
    schema: DatasetSchema,
    limits: WindowLimits,
    chart_output: PathBuf,
    chart_size: (u32, u32),
    renderer: R,
}

impl<R: ChartRenderer> FeeReporter<R> {
    pub fn new(schema: DatasetSchema, config: &Config, renderer: R) -> Self {
        Self {
            schema,
            limits: WindowLimits::from(config),
            chart_output: config.chart_output.clone(),
            chart_size: (config.chart_width, config.chart_height),
            renderer,
        }
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Load `path` with this reporter's schema; empty on failure.
    pub fn load(&self, path: &Path) -> Vec<ForecastRecord> {
        loader::load(path, &self.schema)
    }

    /// Select the requested window and render it. Returns the number of
    /// records plotted. Nothing is rendered unless the window is valid and
    /// non-empty.
    pub fn plot_estimates(
        &self,
        records: &[ForecastRecord],
        request: &PlotRequest<'_>,
    ) -> Result<usize, Diagnostic> {
        let view = select(
            records,
            request.window,
            request.forecaster,
            request.mode,
            &self.limits,
        )?;

        if view.is_empty() {
            return Err(Diagnostic::empty_dataset(request.forecaster));
        }

        debug!(
            "Plotting {} records in window {}..={}",
            view.len(),
            request.window.start,
            request.window.end
        );

        let chart = self.chart_data(&view)?;
        let options = ChartOptions {
            output: self.chart_output.clone(),
            width: self.chart_size.0,
            height: self.chart_size.1,
            log_y: request.log_y,
        };
        self.renderer.render(&chart, &options)?;

        Ok(view.len())
    }

    /// Accuracy report over every record, or one forecaster's records.
    pub fn summary(
        &self,
        records: &[ForecastRecord],
        forecaster: Option<&str>,
    ) -> Result<Report, Diagnostic> {
        if records.is_empty() {
            return Err(Diagnostic::DataNotProvided);
        }
        let view = by_forecaster(records, forecaster);
        build_report(&view, &self.schema, forecaster)
    }

    /// Chart series for `view`: one line per estimate field plus the band.
    pub fn chart_data(&self, view: &FilteredView<'_>) -> Result<ChartData, ReportError> {
        let series = self
            .schema
            .estimates
            .iter()
            .map(|field| -> Result<Series, ReportError> {
                Ok(Series {
                    label: field.label.clone(),
                    values: column(view, field)?,
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        let labels = &self.schema.chart;
        Ok(ChartData {
            title: labels.title.clone(),
            subtitle: labels.subtitle.clone(),
            x_label: labels.x_label.clone(),
            y_label: labels.y_label.clone(),
            x_values: view.iter().map(|record| record.block_height as f64).collect(),
            series,
            band: Band {
                label: labels.band_label.clone(),
                low: column(view, &self.schema.band_low)?,
                high: column(view, &self.schema.band_high)?,
            },
        })
    }
}

fn column(view: &FilteredView<'_>, field: &FeeField) -> Result<Vec<f64>, ReportError> {
    view.iter()
        .map(|record| {
            record
                .fee(&field.key)
                .map(|value| value as f64)
                .ok_or_else(|| ReportError::MissingField {
                    block_height: record.block_height,
                    field: field.key.clone(),
                })
        })
        .collect()
}
