//! Logging bootstrap.
//!
//! Console output plus a daily-rolling main log and an errors-only log, all driven by
//! one `EnvFilter`. `RUST_LOG` wins over the configured level.

use arcadia_types::{ConfigError, LogConfig};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Keeps the non-blocking writers flushing. Hold for the lifetime of the process.
#[must_use = "dropping the guards stops file logging"]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Build the filter: `RUST_LOG` if set and valid, else the configured level.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
pub fn init_logging(config: &LogConfig) -> Result<LogGuards, ConfigError> {
    std::fs::create_dir_all(&config.dir).map_err(|e| ConfigError::from_io_error(&e))?;

    let mut guards = Vec::with_capacity(2);

    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    guards.push(file_guard);

    let console_layer = fmt::layer().compact().with_target(true);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_writer(file_writer);

    let error_layer = if config.error_file {
        let error_appender = tracing_appender::rolling::daily(&config.dir, "errors.log");
        let (error_writer, error_guard) = tracing_appender::non_blocking(error_appender);
        guards.push(error_guard);
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_line_number(true)
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(console_layer)
        .with(file_layer)
        .with(error_layer)
        .try_init()
        .map_err(|e| ConfigError::WriteError { message: format!("logger already set: {e}") })?;

    Ok(LogGuards { _guards: guards })
}
