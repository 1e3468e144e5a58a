//! Banded comparison chart.
//!
//! [`ChartData`] holds parallel series over one shared x-axis plus the
//! percentile band drawn underneath them. [`ChartRenderer`] is the seam the
//! pipeline draws through; [`PlottersRenderer`] writes a PNG or SVG file
//! with `plotters`, picking the backend from the output extension.

use std::panic;
use std::path::{Path, PathBuf};

use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::FontStyle;
use thiserror::Error;
use tracing::info;

const SERIES_COLORS: [RGBColor; 6] = [
    RGBColor(0, 0, 255),
    RGBColor(230, 190, 0),
    RGBColor(200, 0, 100),
    RGBColor(34, 139, 34),
    RGBColor(255, 140, 0),
    RGBColor(90, 90, 90),
];

const BAND_COLOR: RGBColor = RGBColor(128, 128, 128);
const LOG_FLOOR: f64 = 0.1;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("series `{label}` has {actual} points, expected {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("nothing to plot")]
    NoData,

    #[error("plotting backend error: {0}")]
    Backend(String),

    #[error("plotting backend panicked")]
    BackendPanicked,
}

fn backend_error<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Backend(err.to_string())
}

/// One named line.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Shaded region between two bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub label: String,
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub subtitle: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub x_values: Vec<f64>,
    pub series: Vec<Series>,
    pub band: Band,
}

impl ChartData {
    /// Every series and both band bounds must line up with `x_values`.
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.x_values.is_empty() {
            return Err(ChartError::NoData);
        }

        let expected = self.x_values.len();
        let columns = self
            .series
            .iter()
            .map(|series| (series.label.as_str(), series.values.len()))
            .chain([
                ("band low", self.band.low.len()),
                ("band high", self.band.high.len()),
            ]);

        for (label, actual) in columns {
            if actual != expected {
                return Err(ChartError::LengthMismatch {
                    label: label.to_string(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    pub fn x_range(&self) -> (f64, f64) {
        let min = self.x_values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.x_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max > min {
            (min, max)
        } else {
            (min - 1.0, min + 1.0)
        }
    }

    /// Y extent covering every line and the band, with 10% headroom.
    /// On a log axis the lower bound is the smallest positive value.
    pub fn y_range(&self, log_y: bool) -> (f64, f64) {
        let values = || {
            self.series
                .iter()
                .flat_map(|series| series.values.iter())
                .chain(self.band.low.iter())
                .chain(self.band.high.iter())
                .copied()
        };

        let max = values().fold(1.0_f64, f64::max) * 1.1;
        if !log_y {
            return (0.0, max);
        }

        let min_pos = values().filter(|v| *v > 0.0).fold(f64::INFINITY, f64::min);
        let min = if min_pos.is_finite() {
            min_pos.max(LOG_FLOOR)
        } else {
            LOG_FLOOR
        };
        (min, max.max(min * 10.0))
    }

    /// Outline of the band: along the low bound, then back along the high one.
    pub fn band_outline(&self) -> Vec<(f64, f64)> {
        let lower = self.x_values.iter().copied().zip(self.band.low.iter().copied());
        let upper = self
            .x_values
            .iter()
            .copied()
            .zip(self.band.high.iter().copied())
            .rev();
        lower.chain(upper).collect()
    }
}

/// Output format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ChartFormat::Svg,
            _ => ChartFormat::Png,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub log_y: bool,
}

/// Draws a [`ChartData`] somewhere.
pub trait ChartRenderer {
    fn render(&self, chart: &ChartData, options: &ChartOptions) -> Result<(), ChartError>;
}

/// Renders to PNG or SVG with `plotters`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlottersRenderer;

impl ChartRenderer for PlottersRenderer {
    fn render(&self, chart: &ChartData, options: &ChartOptions) -> Result<(), ChartError> {
        chart.validate()?;

        let draw = || -> Result<(), ChartError> {
            let size = (options.width, options.height);
            match ChartFormat::from_path(&options.output) {
                ChartFormat::Png => {
                    let root = BitMapBackend::new(&options.output, size).into_drawing_area();
                    draw_chart(root, chart, options.log_y)
                }
                ChartFormat::Svg => {
                    let root = SVGBackend::new(&options.output, size).into_drawing_area();
                    draw_chart(root, chart, options.log_y)
                }
            }
        };

        // Font lookups inside the backend can panic on headless hosts.
        panic::catch_unwind(panic::AssertUnwindSafe(draw))
            .map_err(|_| ChartError::BackendPanicked)??;

        info!(
            "Chart with {} points written to {}",
            chart.x_values.len(),
            options.output.display()
        );
        Ok(())
    }
}

fn draw_chart<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    chart: &ChartData,
    log_y: bool,
) -> Result<(), ChartError>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(backend_error)?;
    let area = root
        .titled(&chart.title, ("sans-serif", 22).into_font().style(FontStyle::Italic))
        .map_err(backend_error)?;

    let (x_min, x_max) = chart.x_range();
    let (y_min, y_max) = chart.y_range(log_y);

    let mut builder = ChartBuilder::on(&area);
    builder
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 50);
    if let Some(subtitle) = chart.subtitle.as_deref() {
        builder.caption(subtitle, ("sans-serif", 18).into_font().style(FontStyle::Bold));
    }

    if log_y {
        let mut ctx = builder
            .build_cartesian_2d(x_min..x_max, (y_min..y_max).log_scale())
            .map_err(backend_error)?;
        ctx.configure_mesh()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.0}", v))
            .draw()
            .map_err(backend_error)?;
        // Zero fee rates have no place on a log axis; pin them to its floor.
        draw_layers(&mut ctx, chart, |v| v.max(y_min))?;
    } else {
        let mut ctx = builder
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(backend_error)?;
        ctx.configure_mesh()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .x_label_formatter(&|v| format!("{:.0}", v))
            .y_label_formatter(&|v| format!("{:.0}", v))
            .draw()
            .map_err(backend_error)?;
        draw_layers(&mut ctx, chart, |v| v)?;
    }

    area.present().map_err(backend_error)?;
    Ok(())
}

/// Band first, then one line per series, then the legend.
fn draw_layers<'a, DB, Y, F>(
    ctx: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>,
    chart: &ChartData,
    clamp: F,
) -> Result<(), ChartError>
where
    DB: DrawingBackend + 'a,
    Y: Ranged<ValueType = f64>,
    F: Fn(f64) -> f64,
{
    let band_style = BAND_COLOR.mix(0.5).filled();
    let outline: Vec<(f64, f64)> = chart
        .band_outline()
        .into_iter()
        .map(|(x, y)| (x, clamp(y)))
        .collect();

    ctx.draw_series(std::iter::once(Polygon::new(outline, band_style)))
        .map_err(backend_error)?
        .label(chart.band.label.as_str())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], band_style));

    for (idx, series) in chart.series.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        let style = ShapeStyle {
            color: color.to_rgba(),
            filled: false,
            stroke_width: 2,
        };
        let points = chart
            .x_values
            .iter()
            .copied()
            .zip(series.values.iter().map(|v| clamp(*v)));

        ctx.draw_series(LineSeries::new(points, style))
            .map_err(backend_error)?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .position(SeriesLabelPosition::UpperLeft)
        .draw()
        .map_err(backend_error)?;

    Ok(())
}
