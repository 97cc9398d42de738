//! Runtime error types.

use thiserror::Error;

/// Errors that can occur while loading configuration or installing the
/// logging stack.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration extraction failed.
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    /// A log filter directive could not be parsed.
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// The offending directive.
        directive: String,
        /// Reason for failure.
        reason: String,
    },

    /// The global tracing subscriber could not be installed.
    #[error("failed to install logging subscriber: {0}")]
    Subscriber(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
