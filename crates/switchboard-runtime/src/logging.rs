//! Logging setup for the Switchboard runtime.
//!
//! A thin builder over `tracing-subscriber`: an `EnvFilter` built from
//! the configured level plus extra directives, a fmt layer in one of
//! three formats, and an optional daily-rolled file output through
//! `tracing-appender`.
//!
//! # Example
//!
//! ```rust,ignore
//! use switchboard_runtime::logging::LoggingBuilder;
//!
//! let _guard = LoggingBuilder::new()
//!     .level("info")
//!     .directive("switchboard_core=debug")
//!     .init();
//! ```
//!
//! When file output is enabled the returned [`WorkerGuard`] must be
//! held for the lifetime of the process; dropping it stops the
//! background writer and loses buffered lines.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{ConfigError, ConfigResult};

/// File name prefix for daily-rolled log files.
const LOG_FILE_PREFIX: &str = "switchboard.log";

/// Builder for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: String,
    directives: Vec<String>,
    format: LogFormat,
    with_target: bool,
    directory: Option<PathBuf>,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder with `info` level, full format, no file output.
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            format: LogFormat::Full,
            with_target: true,
            directory: None,
        }
    }

    /// Creates a builder pre-populated from configuration.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            directives: Vec::new(),
            format: config.format,
            with_target: config.with_target,
            directory: config.directory.clone(),
        }
    }

    /// Sets the base filter (a level or a full directive string).
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Adds a per-target filter directive (e.g. `"my_crate=debug"`).
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Sets the line format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Toggles the event target in each line.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Also writes daily-rolled files into `directory`.
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    fn build_filter(&self) -> ConfigResult<EnvFilter> {
        let mut filter =
            EnvFilter::try_new(&self.level).map_err(|err| ConfigError::InvalidFilter {
                directive: self.level.clone(),
                reason: err.to_string(),
            })?;
        for directive in &self.directives {
            let parsed = directive
                .parse()
                .map_err(|err: tracing_subscriber::filter::ParseError| {
                    ConfigError::InvalidFilter {
                        directive: directive.clone(),
                        reason: err.to_string(),
                    }
                })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    /// Installs the global subscriber.
    ///
    /// Returns the file writer's guard when file output is enabled.
    pub fn try_init(self) -> ConfigResult<Option<WorkerGuard>> {
        let filter = self.build_filter()?;
        let registry = tracing_subscriber::registry().with(filter);

        let (writer, guard) = match &self.directory {
            Some(directory) => {
                let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        macro_rules! install {
            ($layer:expr) => {
                registry
                    .with($layer)
                    .try_init()
                    .map_err(|err| ConfigError::Subscriber(err.to_string()))?
            };
        }

        match (writer, self.format) {
            (Some(writer), LogFormat::Full) => {
                install!(fmt::layer()
                    .with_target(self.with_target)
                    .with_ansi(false)
                    .with_writer(writer));
            }
            (Some(writer), LogFormat::Compact) => {
                install!(fmt::layer()
                    .with_target(self.with_target)
                    .with_ansi(false)
                    .with_writer(writer)
                    .compact());
            }
            (Some(writer), LogFormat::Pretty) => {
                install!(fmt::layer()
                    .with_target(self.with_target)
                    .with_ansi(false)
                    .with_writer(writer)
                    .pretty());
            }
            (None, LogFormat::Full) => {
                install!(fmt::layer().with_target(self.with_target));
            }
            (None, LogFormat::Compact) => {
                install!(fmt::layer().with_target(self.with_target).compact());
            }
            (None, LogFormat::Pretty) => {
                install!(fmt::layer().with_target(self.with_target).pretty());
            }
        }

        Ok(guard)
    }

    /// Installs the global subscriber, reporting failures to stderr
    /// instead of propagating them.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(err) => {
                eprintln!("warning: logging initialization failed: {err}");
                None
            }
        }
    }
}

/// Installs logging from a [`LoggingConfig`] section.
pub fn init_from_config(config: &LoggingConfig) -> ConfigResult<Option<WorkerGuard>> {
    LoggingBuilder::from_config(config).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_rejected() {
        let err = LoggingBuilder::new()
            .level("core=notalevel")
            .try_init()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFilter { .. }));
    }

    #[test]
    fn invalid_directive_is_rejected() {
        let err = LoggingBuilder::new()
            .directive("not a directive")
            .try_init()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFilter { directive, .. } if directive == "not a directive"
        ));
    }

    #[test]
    fn builder_mirrors_config() {
        let config = LoggingConfig {
            level: "debug".into(),
            format: LogFormat::Compact,
            with_target: false,
            directory: Some(PathBuf::from("/var/log/bot")),
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, "debug");
        assert_eq!(builder.format, LogFormat::Compact);
        assert!(!builder.with_target);
        assert_eq!(builder.directory, Some(PathBuf::from("/var/log/bot")));
    }
}