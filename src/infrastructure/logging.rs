//! Centralized logging
//!
//! Console output is always on. With a log directory configured, logs are
//! also written to daily rolling files, separated by component target:
//! - main.* - everything, as JSON
//! - error.* - warnings and errors only
//! - cache.* / pool.* / rate_limit.* - per-component events

use crate::infrastructure::config::LoggingConfig;
use crate::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Event targets used by the components
pub const COMPONENT_TARGETS: [&str; 3] = ["cache", "pool", "rate_limit"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging
///
/// `RUST_LOG` overrides the configured level. Returned guards flush the
/// file writers and must be kept alive for the duration of the program.
/// A log directory that cannot be created, or a subscriber already being
/// installed, is reported as [`crate::Error::Io`].
pub fn init_logging(config: &LoggingConfig) -> Result<Vec<WorkerGuard>> {
    let mut guards = Vec::new();

    let file_layers = match &config.log_dir {
        Some(dir) => file_layers(dir, &mut guards)?,
        None => Vec::new(),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // Console layer for development
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(file_layers)
        .with(filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    match &config.log_dir {
        Some(dir) => tracing::info!("Logging initialized. Log files in {}", dir.display()),
        None => tracing::info!("Logging initialized (console only)"),
    }

    Ok(guards)
}

/// Build the file layers, creating `dir` when missing
fn file_layers(dir: &Path, guards: &mut Vec<WorkerGuard>) -> io::Result<Vec<BoxedLayer>> {
    fs::create_dir_all(dir)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    // Main log - all events
    let (main_appender, main_guard) = create_appender(dir, "main");
    guards.push(main_guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(main_appender)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .boxed(),
    );

    // Error log - ERROR and WARN only
    let (error_appender, error_guard) = create_appender(dir, "error");
    guards.push(error_guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(error_appender)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_filter(LevelFilter::WARN)
            .boxed(),
    );

    for target in COMPONENT_TARGETS {
        let (appender, guard) = create_appender(dir, target);
        guards.push(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_filter(filter_fn(move |metadata| metadata.target() == target))
                .boxed(),
        );
    }

    Ok(layers)
}

/// Create a rolling file appender
fn create_appender(dir: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);

    tracing_appender::non_blocking(appender)
}

/// Log macro helpers for component targets
#[macro_export]
macro_rules! log_cache {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "cache", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_pool {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "pool", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_limiter {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "rate_limit", $level, $($arg)+)
    };
}
