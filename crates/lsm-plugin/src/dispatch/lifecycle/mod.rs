//! Registration lifecycle and process termination outcomes.

use std::process::ExitCode;

use crate::capability::{REGISTER_OPERATION, UNREGISTER_OPERATION};

/// Exit status reported for every abnormal termination.
pub const ABNORMAL_EXIT_STATUS: u8 = 2;

/// Registration status of the plugin instance, as tracked by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed but not yet registered.
    #[default]
    Uninitialized,
    /// `plugin_register` completed successfully; the backend holds resources
    /// that must be released if the client disappears.
    Registered,
    /// `plugin_unregister` completed successfully.
    Unregistered,
}

impl LifecycleState {
    /// Returns the state after `method` was dispatched successfully.
    ///
    /// The state moves on dispatch success, before the response is written;
    /// a failed response write therefore still leaves the plugin registered.
    #[must_use]
    pub fn after_success(self, method: &str) -> Self {
        match method {
            REGISTER_OPERATION => Self::Registered,
            UNREGISTER_OPERATION => Self::Unregistered,
            _ => self,
        }
    }

    /// Returns `true` when losing the client requires a cleanup call.
    #[must_use]
    pub const fn needs_cleanup(self) -> bool {
        matches!(self, Self::Registered)
    }
}

/// How a plugin process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The client unregistered the plugin.
    Graceful,
    /// The client disconnected without ever registering.
    PeerDisconnected,
    /// The client disconnected while the plugin was registered; the
    /// dispatcher ran `plugin_unregister` itself.
    AbandonedRegistration,
    /// The plugin could not be constructed.
    ConstructionFailed,
    /// The inherited connection could not be adopted.
    ConnectionUnavailable,
    /// A fault escaped per-request handling, usually a broken connection.
    Fault,
}

impl Termination {
    /// Returns `true` for terminations a supervisor should treat as failures.
    #[must_use]
    pub const fn is_abnormal(self) -> bool {
        !matches!(self, Self::Graceful | Self::PeerDisconnected)
    }

    /// Returns the numeric process exit status.
    #[must_use]
    pub const fn exit_status(self) -> u8 {
        if self.is_abnormal() {
            ABNORMAL_EXIT_STATUS
        } else {
            0
        }
    }

    /// Returns the process exit code.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}
