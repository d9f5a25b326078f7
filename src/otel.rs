//! Structured logging initialisation.
//!
//! The engine only emits `tracing` events; nothing is printed unless the
//! embedding service installs a subscriber. [`init_logging_with_config`] is
//! the one the probe CLI and most services use:
//! - JSON lines for production, pretty output for development
//! - `RUST_LOG` wins over the configured level when it is set
//! - extra per-target directives (`brrtrouter_mvc::call=trace`)
//! - optional non-blocking writer so logging stays off the request path
//!
//! Useful targets: `brrtrouter_mvc::dispatcher` (registration, mounts),
//! `brrtrouter_mvc::controller` (candidate selection), `brrtrouter_mvc::call`
//! (call start/complete, unhandled failures).

use std::env;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `pretty` (any case) selects [`LogFormat::Pretty`]; anything else is JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub log_level: String,
    pub format: LogFormat,
    /// Hand lines to a background writer thread
    pub async_logging: bool,
    /// Comma-separated `target=level` directives added on top of the level
    pub target_filter: Option<String>,
    /// Source file and line on every event
    pub include_location: bool,
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl LogConfig {
    /// Read `BRRTR_LOG_LEVEL`, `BRRTR_LOG_FORMAT`, `BRRTR_LOG_ASYNC`,
    /// `BRRTR_LOG_TARGET_FILTER` and `BRRTR_LOG_INCLUDE_LOCATION`, falling back
    /// to [`default_prod`](Self::default_prod).
    #[must_use]
    pub fn from_env() -> Self {
        let prod = Self::default_prod();
        Self {
            log_level: env::var("BRRTR_LOG_LEVEL").unwrap_or(prod.log_level),
            format: env::var("BRRTR_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(prod.format),
            async_logging: env_bool("BRRTR_LOG_ASYNC", prod.async_logging),
            target_filter: env::var("BRRTR_LOG_TARGET_FILTER").ok(),
            include_location: env_bool("BRRTR_LOG_INCLUDE_LOCATION", prod.include_location),
        }
    }

    /// Debug level, pretty, synchronous, with source locations.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }

    /// The configured level; unknown names fall back to INFO.
    #[must_use]
    pub fn level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Base level plus target directives. Invalid directives are skipped and returned.
    fn filter(&self, base: EnvFilter) -> (EnvFilter, Vec<String>) {
        let mut env_filter = base;
        let mut rejected = Vec::new();
        let directives = self
            .target_filter
            .iter()
            .flat_map(|f| f.split(','))
            .map(str::trim)
            .filter(|d| !d.is_empty());
        for directive in directives {
            match directive.parse() {
                Ok(d) => env_filter = env_filter.add_directive(d),
                Err(_) => rejected.push(directive.to_string()),
            }
        }
        (env_filter, rejected)
    }
}

fn fmt_layer<S>(config: &LogConfig, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer);
    match config.format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use brrtrouter_mvc::otel::{init_logging_with_config, LogConfig};
///
/// init_logging_with_config(&LogConfig::from_env()).expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let base = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));
    let (env_filter, rejected) = config.filter(base);

    let writer = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        // The writer thread must outlive every event; it stops when the process exits.
        std::mem::forget(guard);
        BoxMakeWriter::new(non_blocking)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(config, writer))
        .try_init()
        .context("Failed to initialize logging")?;

    for directive in rejected {
        tracing::warn!(directive = %directive, "Ignored invalid log filter directive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let dev = LogConfig::default_dev();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert_eq!(dev.level(), Level::DEBUG);
        assert!(!dev.async_logging);
        assert!(dev.include_location);

        let prod = LogConfig::default_prod();
        assert_eq!(prod.format, LogFormat::Json);
        assert_eq!(prod.level(), Level::INFO);
        assert!(prod.async_logging);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let mut config = LogConfig::default_prod();
        config.log_level = "loud".to_string();
        assert_eq!(config.level(), Level::INFO);
        config.log_level = "TRACE".to_string();
        assert_eq!(config.level(), Level::TRACE);
    }

    #[test]
    fn test_target_filter_skips_invalid_directives() {
        let mut config = LogConfig::default_dev();
        config.target_filter = Some("brrtrouter_mvc::call=trace, ,brrtrouter_mvc=verbose".to_string());
        let (_filter, rejected) = config.filter(EnvFilter::new("info"));
        assert_eq!(rejected, vec!["brrtrouter_mvc=verbose".to_string()]);
    }
}
