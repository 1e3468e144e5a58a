use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive for a report run.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize structured logging for the report run.
///
/// Must be called once at startup (in main.rs). `RUST_LOG` wins over the
/// level picked by `--verbose`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!("Logging initialized");
}
