//! Shared configuration for storage plugin processes.
//!
//! Plugin executables receive their inherited connection descriptor as the
//! sole positional argument, so runtime configuration is sourced from the
//! environment (prefix `LSM_`) and optional configuration files rather than
//! from the command line. Only logging is configurable today: the filter
//! expression and the output format used by the tracing subscriber.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use self::defaults::{DEFAULT_LOG_FILTER, default_log_filter_string, default_log_format};
pub use self::logging::LogFormat;

/// Runtime configuration shared by every plugin binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LSM")]
pub struct Config {
    /// Tracing filter expression, for example `info` or `lsm_plugin=debug`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records written to stderr.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Loads configuration from the environment and configuration files.
    ///
    /// Only the program name is forwarded to the layered loader; the rest of
    /// the process arguments belong to the plugin runner.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when a configuration source is
    /// present but malformed.
    pub fn load_for_program(program: impl Into<OsString>) -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter([program.into()])
    }
}
