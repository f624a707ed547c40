//! Hookshot Logging
//!
//! Installs a `tracing-subscriber` formatter configured from `HOOKSHOT_*`
//! environment variables. The library crates only emit `tracing` events;
//! binaries and tests call [`init`] once to see them.
//!
//! # Usage
//!
//! ```rust
//! hookshot_log::init();
//! tracing::info!(endpoint = "live", "Webhook accepted");
//! ```
//!
//! # Environment Variables
//!
//! - `HOOKSHOT_DEBUG=1` - Enable debug logging
//! - `HOOKSHOT_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `HOOKSHOT_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `HOOKSHOT_LOG_COLOR=1|0` - Enable/disable colors
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use once_cell::sync::OnceCell;
use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// No logging
    Off,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by [`EnvFilter`].
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Compact,
            color: false,
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup("HOOKSHOT_DEBUG").is_some_and(|v| flag(&v));

        let level = lookup("HOOKSHOT_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("HOOKSHOT_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Compact);

        let color = lookup("HOOKSHOT_LOG_COLOR")
            .map(|v| flag(&v))
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }
}

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber configured from the environment.
///
/// Calling it again is a no-op.
pub fn init() {
    try_init_with(LogConfig::from_env());
}

/// Install the global subscriber with an explicit configuration.
///
/// Returns `true` if this call installed it; `false` when a subscriber was
/// already in place.
pub fn try_init_with(config: LogConfig) -> bool {
    let mut installed = false;
    let stored = INSTALLED.get_or_try_init(|| {
        if install(&config) {
            installed = true;
            Ok(config)
        } else {
            Err(())
        }
    });
    stored.is_ok() && installed
}

/// The configuration of the subscriber this crate installed, if any.
pub fn installed_config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

fn install(config: &LogConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let result = match config.format {
        Format::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(config.color).with_writer(std::io::stderr))
            .try_init(),
        Format::Compact => registry
            .with(fmt::layer().compact().with_ansi(config.color).with_writer(std::io::stderr))
            .try_init(),
        Format::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.is_ok()
}
