//! Structured Logger
//!
//! `tracing` subscriber with a console layer and a JSON file layer that
//! rotates daily. `RUST_LOG` overrides the configured level.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Base name of the rolling log file (`promptcraft.log.YYYY-MM-DD`).
pub const LOG_FILE_NAME: &str = "promptcraft.log";

/// Initialize the global logger. Later calls are no-ops.
///
/// Console output goes to stderr so command output on stdout stays clean.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, log_dir.as_ref(), LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
