//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise the level comes from
//! `KEYSTONE_LOG_LEVEL` (default `info`) and `--verbose` forces `debug`.
//! `KEYSTONE_LOG_FORMAT` picks `json` (default), `pretty` or `compact`.
//! Logs go to stderr so stdout carries only command output.

use std::str::FromStr;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_LEVEL_ENV: &str = "KEYSTONE_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "KEYSTONE_LOG_FORMAT";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// JSON for structured logging
    #[default]
    Json,
    /// Multi-line human readable
    Pretty,
    /// Single-line human readable
    Compact,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is absent
    pub level: String,
    pub format: Format,
    /// Ignore `RUST_LOG`
    pub force_level: bool,
}

impl LogConfig {
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(verbose: bool, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = if verbose {
            "debug".to_string()
        } else {
            lookup(LOG_LEVEL_ENV)
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| "info".to_string())
        };

        // unknown formats fall back to JSON
        let format = lookup(LOG_FORMAT_ENV)
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        Self {
            level,
            format,
            force_level: verbose,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.force_level {
            return EnvFilter::new(&self.level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let config = LogConfig::from_env(verbose);
    let registry = tracing_subscriber::registry().with(config.filter());

    let result = match config.format {
        Format::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        Format::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        Format::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    }
}
