use crate::logging::LogFormat;

/// Default log filter expression used by plugin binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned log filter value used where allocation is required.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for plugin binaries.
///
/// Plugins are usually spawned by the storage daemon, whose log collector
/// expects structured records.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
