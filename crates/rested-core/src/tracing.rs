//! Logging setup shared by rested clients and servers.
//!
//! The library itself only emits `tracing` events; binaries decide where
//! they go by calling [`init_tracing`] once at startup.
//!
//! ```ignore
//! use rested_core::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::service())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Target prefix used by every rested crate.
pub const LOG_TARGET: &str = "rested";

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line human readable output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// One JSON object per line.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to rested targets when `RUST_LOG` is unset.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Print file and line number.
    pub file_and_line: bool,
    pub targets: bool,
    pub timestamps: bool,
    /// Log span open and close.
    pub span_events: bool,
    /// Filter directive that takes precedence over `RUST_LOG`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::default(),
            file_and_line: false,
            targets: true,
            timestamps: true,
            span_events: false,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose compact output for local development and tests.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: TracingOutputFormat::Compact,
            file_and_line: true,
            timestamps: false,
            ..Self::default()
        }
    }

    /// Structured JSON output for a long-running server process.
    #[must_use]
    pub fn service() -> Self {
        Self {
            format: TracingOutputFormat::Json,
            span_events: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    /// The directive used when neither `filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{LOG_TARGET}={}", self.level)
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.filter {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the filter directive is
/// invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;
    let spans = match config.span_events {
        true => FmtSpan::NEW | FmtSpan::CLOSE,
        false => FmtSpan::NONE,
    };

    let base = fmt::layer()
        .with_file(config.file_and_line)
        .with_line_number(config.file_and_line)
        .with_target(config.targets)
        .with_span_events(spans);

    let layer = match (config.format, config.timestamps) {
        (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
        (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (TracingOutputFormat::Compact, true) => base.compact().boxed(),
        (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        (TracingOutputFormat::Json, true) => base.json().boxed(),
        (TracingOutputFormat::Json, false) => base.json().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.default_directive(), "rested=INFO");
        assert_eq!(config.format, TracingOutputFormat::Pretty);
        assert!(config.timestamps && config.filter.is_none());
    }

    #[test]
    fn presets() {
        let dev = TracingConfig::development();
        assert_eq!(dev.default_directive(), "rested=DEBUG");
        assert_eq!(dev.format, TracingOutputFormat::Compact);
        assert!(!dev.timestamps);

        let service = TracingConfig::service();
        assert_eq!(service.format, TracingOutputFormat::Json);
        assert!(service.span_events && !service.file_and_line);
    }

    #[test]
    fn explicit_filter_wins() {
        let config = TracingConfig::default()
            .with_level(Level::WARN)
            .with_filter("rested_server=trace");
        assert_eq!(config.filter.as_deref(), Some("rested_server=trace"));
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = TracingConfig::default().with_filter("rested=notalevel");
        assert!(matches!(
            config.env_filter(),
            Err(TracingError::EnvFilter(_))
        ));
    }
}
