//! Structured logging setup.
//!
//! Configured from the environment:
//!
//! | Variable                   | Values                        | Default |
//! |----------------------------|-------------------------------|---------|
//! | `WICKET_LOG_LEVEL`         | trace/debug/info/warn/error   | `info`  |
//! | `WICKET_LOG_FORMAT`        | json/pretty                   | `json`  |
//! | `WICKET_LOG_ASYNC`         | true/false                    | `true`  |
//! | `WICKET_LOG_TARGET_FILTER` | comma-separated directives    | unset   |
//!
//! `RUST_LOG`, when set, replaces the level. `may_minihttp::http_server` is
//! capped at `warn` so client disconnects do not flood the output.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a `tracing-appender` non-blocking worker
    pub async_logging: bool,
    /// Extra `EnvFilter` directives, comma-separated
    pub target_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("WICKET_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("WICKET_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: env::var("WICKET_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: env::var("WICKET_LOG_TARGET_FILTER").ok(),
        }
    }

    /// Synchronous pretty output at debug level
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the `EnvFilter` for `config`.
///
/// # Errors
///
/// Returns an error when a target filter directive does not parse.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let level = parse_level(&config.log_level);
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    filter = filter.add_directive(
        "may_minihttp::http_server=warn"
            .parse()
            .context("invalid may_minihttp directive")?,
    );
    if let Some(target_filter) = &config.target_filter {
        for directive in target_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            filter = filter.add_directive(
                directive
                    .parse()
                    .with_context(|| format!("invalid log filter directive: {directive}"))?,
            );
        }
    }
    Ok(filter)
}

/// Install the global subscriber.
///
/// With async logging the returned guard must be held for the life of the
/// process; dropping it flushes and stops the writer.
///
/// # Errors
///
/// Fails on a bad filter directive or when a global subscriber is already set.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config)?;

    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(guard)
}

/// [`LogConfig::from_env`] with the level overridden.
///
/// # Errors
///
/// See [`init_logging_with_config`].
pub fn init_logging(log_level: &str) -> Result<Option<WorkerGuard>> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}
