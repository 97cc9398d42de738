//! Configuration loading for the Switchboard runtime.
//!
//! Configuration is layered with figment, later sources overriding
//! earlier ones:
//!
//! 1. Built-in defaults
//! 2. `switchboard.toml` in the working directory (or an explicit file)
//! 3. Environment variables (`SWITCHBOARD_*`, `__` as section separator)
//!
//! # Environment variable mapping
//!
//! - `SWITCHBOARD_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SWITCHBOARD_DISPATCH__REPORT_ERRORS=false` →
//!   `dispatch.report_errors = false`
//!
//! # Example
//!
//! ```rust,ignore
//! use switchboard_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//! let _guard = switchboard_runtime::logging::init_from_config(&config.logging)?;
//! ```

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Default config file searched in the working directory.
const DEFAULT_CONFIG_FILE: &str = "switchboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchboardConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base filter, either a level (`info`) or a full directive string
    /// (`info,switchboard_core=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Line format for the fmt layer.
    #[serde(default)]
    pub format: LogFormat,

    /// Include the event's target module in each line.
    #[serde(default = "default_with_target")]
    pub with_target: bool,

    /// When set, also write daily-rolled log files into this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            with_target: default_with_target(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// The default fmt layout.
    #[default]
    Full,
    /// One dense line per event.
    Compact,
    /// Multi-line, human-oriented output.
    Pretty,
}

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Report per-update failures back to the originating chat. When
    /// `false` the runtime installs a silent error handler and failures
    /// are only visible in logs.
    #[serde(default = "default_report_errors")]
    pub report_errors: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            report_errors: default_report_errors(),
        }
    }
}

fn default_report_errors() -> bool {
    true
}

/// Layered configuration loader.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader with the default file search and environment
    /// overrides enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads from a specific file instead of `switchboard.toml`.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Disables `SWITCHBOARD_*` environment overrides.
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Extracts the configuration.
    pub fn load(&self) -> ConfigResult<SwitchboardConfig> {
        let file = self
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::from(Serialized::defaults(SwitchboardConfig::default()))
            .merge(Toml::file(file));
        if !self.skip_env {
            figment = figment.merge(Env::prefixed("SWITCHBOARD_").split("__"));
        }

        Ok(figment.extract()?)
    }
}
