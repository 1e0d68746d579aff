//! Logging pipeline: compact or JSON lines on stderr.
//!
//! Configured from the environment:
//! - `HARVEST_LOG_LEVEL`: filter directive, falls back to `RUST_LOG`, then `info`
//! - `HARVEST_LOG_FORMAT`: `compact` (default) or `json`
//!
//! stdout is left to command output so `list --format json` stays parseable.

use std::sync::OnceLock;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGING_CONFIG: OnceLock<LoggingConfig> = OnceLock::new();

/// Logging configuration from environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// `EnvFilter` directive
    pub level: String,
}

/// Supported log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable compact format
    Compact,
    /// Machine-readable JSON format
    Json,
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoggingConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup("HARVEST_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        let level = lookup("HARVEST_LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        Self { format, level }
    }
}

/// Initialize the logging system; later calls are no-ops.
pub fn init_logging() -> Result<()> {
    if LOGGING_CONFIG.get().is_some() {
        return Ok(());
    }
    let config = LOGGING_CONFIG.get_or_init(LoggingConfig::from_env);
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    tracing::debug!(format = ?config.format, level = %config.level, "logging initialized");
    Ok(())
}
