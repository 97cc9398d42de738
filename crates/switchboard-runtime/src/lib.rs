//! # Switchboard Runtime
//!
//! The ambient runtime layer around `switchboard-core`: layered
//! configuration, logging setup, and a [`Runtime`] that drives a
//! dispatcher from an update source with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchboard_core::{Dispatcher, InMemoryStorage};
//! use switchboard_runtime::{ConfigLoader, Runtime, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! let _guard = logging::init_from_config(&config.logging)?;
//!
//! let bot = Dispatcher::new(Arc::new(InMemoryStorage::new()), sender);
//! let runtime = Runtime::from_config(bot, &config);
//! runtime.run_until_ctrl_c(update_source).await;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigLoader, DispatchConfig, LogFormat, LoggingConfig, SwitchboardConfig};
pub use error::{ConfigError, ConfigResult};
pub use logging::LoggingBuilder;
pub use runtime::{Runtime, UpdateSource};
