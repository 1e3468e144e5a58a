// Library root: exposes the pipeline stages for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod chart;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod summary;
pub mod window;

// Only needed by the binary, but public so integration tests can reach them.
pub mod cli;
pub mod logging;
