use clap::Parser;
use dotenvy::dotenv;

use fee_forecast_tracker::chart::PlottersRenderer;
use fee_forecast_tracker::cli::Cli;
use fee_forecast_tracker::config::Config;
use fee_forecast_tracker::error::AppError;
use fee_forecast_tracker::logging::init_logging;
use fee_forecast_tracker::pipeline::{FeeReporter, PlotRequest};
use fee_forecast_tracker::schema::KNOWN_FORECASTERS;

fn main() {
    dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

/// Soft failures (bad window, no data) are logged and the run carries on;
/// only configuration problems end up here as errors.
fn run(cli: &Cli) -> Result<(), AppError> {
    let mut config = Config::from_env()?;
    cli.apply_to(&mut config);
    tracing::debug!("Running with config: {:?}", config);

    let schema = cli.dataset_schema().map_err(AppError::Schema)?;
    let reporter = FeeReporter::new(schema, &config, PlottersRenderer);

    let forecaster = cli.forecaster.as_deref();
    if let Some(name) = forecaster {
        if !KNOWN_FORECASTERS.contains(&name) {
            tracing::warn!("Forecaster `{}` is not one of {:?}", name, KNOWN_FORECASTERS);
        }
    }

    let records = reporter.load(&cli.file);

    if !cli.no_plot {
        match cli.window() {
            Some(window) => {
                let request = PlotRequest {
                    window,
                    forecaster,
                    mode: cli.window_mode(),
                    log_y: cli.log_scale,
                };
                match reporter.plot_estimates(&records, &request) {
                    Ok(count) => tracing::info!("Plotted {} records", count),
                    Err(diagnostic) => tracing::error!("{}", diagnostic),
                }
            }
            None => tracing::info!("No --start/--end window given; skipping chart"),
        }
    }

    if !cli.no_summary {
        match reporter.summary(&records, forecaster) {
            Ok(report) => println!("{}", report),
            Err(diagnostic) => tracing::error!("{}", diagnostic),
        }
    }

    Ok(())
}
