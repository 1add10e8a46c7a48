//! Run-mode selection from the process arguments.

use std::ffi::OsString;
use std::fmt;
use std::os::fd::RawFd;

/// How the plugin process was launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Launched by the storage daemon with an inherited, connected socket.
    Daemon {
        /// Descriptor argument naming the inherited connection.
        descriptor: InheritedDescriptor,
    },
    /// Launched by a person or script; arguments go to the standalone front
    /// end.
    Standalone,
}

impl RunMode {
    /// Decides the run mode from the full argument vector, program name
    /// included.
    ///
    /// Daemon mode applies when exactly one argument follows the program
    /// name and it consists solely of decimal digits. Whether the number is a
    /// usable descriptor is settled later, when the connection is adopted.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::ffi::OsString;
    /// use lsm_plugin::RunMode;
    ///
    /// let args = [OsString::from("sim_lsmplugin"), OsString::from("5")];
    /// match RunMode::detect(&args) {
    ///     RunMode::Daemon { descriptor } => assert_eq!(descriptor.raw_fd(), Some(5)),
    ///     RunMode::Standalone => unreachable!("a lone number selects daemon mode"),
    /// }
    /// ```
    #[must_use]
    pub fn detect(args: &[OsString]) -> Self {
        match args {
            [_, candidate] => candidate
                .to_str()
                .and_then(InheritedDescriptor::parse)
                .map_or(Self::Standalone, |descriptor| Self::Daemon { descriptor }),
            _ => Self::Standalone,
        }
    }
}

/// The decimal descriptor number the storage daemon passed on the command
/// line, kept verbatim so out-of-range values still select daemon mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritedDescriptor {
    digits: String,
}

impl InheritedDescriptor {
    /// Accepts non-empty text made only of ASCII decimal digits.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            digits: text.to_owned(),
        })
    }

    /// The descriptor number, or `None` when it does not fit a [`RawFd`].
    #[must_use]
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.digits.parse().ok()
    }
}

impl fmt::Display for InheritedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}
