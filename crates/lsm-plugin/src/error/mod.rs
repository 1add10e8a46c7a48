//! Domain failures raised by plugin operations.
//!
//! An [`LsmError`] is the structured failure a backend reports when it
//! rejects an operation: a numeric code from [`error_number`], a message,
//! and optional auxiliary data. The dispatcher forwards the triple to the
//! client verbatim, so plugins own the meaning of every code they raise.

use serde_json::Value;
use thiserror::Error;

/// Structured failure raised by a plugin operation.
///
/// # Example
///
/// ```
/// use lsm_plugin::{LsmError, error_number};
///
/// let error = LsmError::new(error_number::NOT_FOUND_SYSTEM, "no controller")
///     .with_data(serde_json::json!({"slot": 3}));
/// assert_eq!(error.code(), 208);
/// assert_eq!(error.message(), "no controller");
/// assert!(error.data().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (code {code})")]
pub struct LsmError {
    code: i32,
    message: String,
    data: Option<Value>,
}

impl LsmError {
    /// Creates a failure with the given code and message.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches auxiliary data to the failure.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Shorthand for a `PLUGIN_BUG` failure.
    #[must_use]
    pub fn plugin_bug(message: impl Into<String>) -> Self {
        Self::new(error_number::PLUGIN_BUG, message)
    }

    /// Shorthand for an `INVALID_ARGUMENT` failure.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(error_number::INVALID_ARGUMENT, message)
    }

    /// Shorthand for a `NO_SUPPORT` failure.
    #[must_use]
    pub fn no_support(message: impl Into<String>) -> Self {
        Self::new(error_number::NO_SUPPORT, message)
    }

    /// Returns the numeric error code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// Returns the human-readable message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the auxiliary data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Splits the failure into its `(code, message, data)` triple.
    #[must_use]
    pub fn into_parts(self) -> (i32, String, Option<Value>) {
        (self.code, self.message, self.data)
    }
}

/// Error numbers shared by the storage daemon, its clients and plugins.
///
/// The values are part of the public client contract and must never be
/// renumbered.
pub mod error_number {
    /// Library-side defect.
    pub const LIB_BUG: i32 = 1;
    /// Plugin-side defect, including unhandled faults inside the plugin.
    pub const PLUGIN_BUG: i32 = 2;
    /// An asynchronous job was started; the result carries the job id.
    pub const JOB_STARTED: i32 = 7;
    /// The operation did not finish within the configured timeout.
    pub const TIMEOUT: i32 = 11;
    /// The storage daemon is not running.
    pub const DAEMON_NOT_RUNNING: i32 = 12;
    /// The caller lacks permission for the operation.
    pub const PERMISSION_DENIED: i32 = 13;
    /// The requested name is already in use.
    pub const NAME_CONFLICT: i32 = 50;
    /// An argument was rejected by the plugin.
    pub const INVALID_ARGUMENT: i32 = 101;
    /// The request would not change any state.
    pub const NO_STATE_CHANGE: i32 = 125;
    /// The storage array refused the network connection.
    pub const NETWORK_CONNREFUSED: i32 = 140;
    /// The storage array host is unreachable.
    pub const NETWORK_HOSTDOWN: i32 = 141;
    /// Generic network failure talking to the storage array.
    pub const NETWORK_ERROR: i32 = 142;
    /// The plugin ran out of memory.
    pub const NO_MEMORY: i32 = 152;
    /// The operation is not supported by this plugin.
    pub const NO_SUPPORT: i32 = 153;
    /// No pool matches the request.
    pub const NOT_FOUND_POOL: i32 = 203;
    /// No volume matches the request.
    pub const NOT_FOUND_VOLUME: i32 = 205;
    /// No system matches the request.
    pub const NOT_FOUND_SYSTEM: i32 = 208;
    /// No disk matches the request.
    pub const NOT_FOUND_DISK: i32 = 209;
    /// Authentication against the storage array failed.
    pub const PLUGIN_AUTH_FAILED: i32 = 300;
    /// Inter-process communication with the plugin failed.
    pub const PLUGIN_IPC_FAIL: i32 = 301;
    /// The plugin executable does not exist.
    pub const PLUGIN_NOT_EXIST: i32 = 311;
    /// The pool lacks free space for the request.
    pub const NOT_ENOUGH_SPACE: i32 = 350;
    /// Communication with the transport failed.
    pub const TRANSPORT_COMMUNICATION: i32 = 400;
    /// A message could not be serialised or deserialised.
    pub const TRANSPORT_SERIALIZATION: i32 = 401;
    /// The transport was handed an invalid argument.
    pub const TRANSPORT_INVALID_ARG: i32 = 402;
    /// The search key is not supported by the queried listing.
    pub const UNSUPPORTED_SEARCH_KEY: i32 = 510;
}
