//! Storage simulator plugin.
//!
//! `sim_lsmplugin` answers the core storage operations from an in-memory
//! [`Inventory`], which makes it useful for exercising clients and the
//! plugin runner without real hardware. URIs use the `sim://` scheme.

pub mod inventory;

#[cfg(test)]
mod tests;

use lsm_plugin::{LsmError, LsmPlugin, OperationTable, search_property};
use serde::Deserialize;
use tracing::{debug, info};

pub use self::inventory::{Inventory, Pool, SimulatedArray, System};

const SIM_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::plugin");

/// URI scheme accepted by `plugin_register`.
pub const SIM_URI_SCHEME: &str = "sim://";

/// Description returned by `plugin_info`.
pub const PLUGIN_DESCRIPTION: &str = "Storage simulator";

/// Timeout used when the client does not supply one, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    uri: String,
    timeout_ms: u64,
}

/// Simulator plugin state.
#[derive(Debug)]
pub struct SimPlugin<I = SimulatedArray> {
    inventory: I,
    session: Option<Session>,
}

impl Default for SimPlugin {
    fn default() -> Self {
        Self::new(SimulatedArray)
    }
}

impl<I: Inventory> SimPlugin<I> {
    /// Creates an unregistered plugin backed by `inventory`.
    #[must_use]
    pub const fn new(inventory: I) -> Self {
        Self {
            inventory,
            session: None,
        }
    }

    /// Returns `true` while a client session is registered.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.session.is_some()
    }

    fn session_mut(&mut self) -> Result<&mut Session, LsmError> {
        self.session
            .as_mut()
            .ok_or_else(|| LsmError::invalid_argument("plugin not registered"))
    }

    fn register(&mut self, args: RegisterArgs) -> Result<(), LsmError> {
        check_flags(args.flags)?;
        if !args.uri.starts_with(SIM_URI_SCHEME) {
            return Err(LsmError::invalid_argument(format!(
                "uri '{}' does not use the {SIM_URI_SCHEME} scheme",
                args.uri
            )));
        }
        info!(
            target: SIM_TARGET,
            uri = %args.uri,
            timeout_ms = args.timeout,
            with_password = args.password.is_some(),
            "registered"
        );
        self.session = Some(Session {
            uri: args.uri,
            timeout_ms: args.timeout,
        });
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(session) = self.session.take() {
            info!(target: SIM_TARGET, uri = %session.uri, "unregistered");
        }
    }

    fn pools(&mut self, args: PoolsArgs) -> Result<Vec<Pool>, LsmError> {
        check_flags(args.flags)?;
        self.session_mut()?;
        debug!(
            target: SIM_TARGET,
            key = ?args.search_key,
            value = ?args.search_value,
            "listing pools"
        );
        search_property(
            self.inventory.pools(),
            args.search_key.as_deref(),
            args.search_value.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegisterArgs {
    uri: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "default_timeout")]
    timeout: u64,
    #[serde(default)]
    flags: u64,
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlagsArgs {
    #[serde(default)]
    flags: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeoutArgs {
    ms: u64,
    #[serde(default)]
    flags: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolsArgs {
    #[serde(default)]
    search_key: Option<String>,
    #[serde(default)]
    search_value: Option<String>,
    #[serde(default)]
    flags: u64,
}

/// No flags are defined for any simulator operation; all bits are reserved.
fn check_flags(flags: u64) -> Result<(), LsmError> {
    if flags == 0 {
        Ok(())
    } else {
        Err(LsmError::invalid_argument(format!(
            "reserved flags must be zero, got {flags:#x}"
        )))
    }
}

impl<I: Inventory + 'static> LsmPlugin for SimPlugin<I> {
    fn operations(table: &mut OperationTable<Self>) {
        table
            .operation("plugin_register", Self::register)
            .operation("plugin_unregister", |plugin: &mut Self, args: FlagsArgs| {
                check_flags(args.flags)?;
                plugin.unregister();
                Ok(())
            })
            .operation("plugin_info", |plugin: &mut Self, args: FlagsArgs| {
                check_flags(args.flags)?;
                plugin.session_mut()?;
                Ok((PLUGIN_DESCRIPTION, env!("CARGO_PKG_VERSION")))
            })
            .operation("time_out_set", |plugin: &mut Self, args: TimeoutArgs| {
                check_flags(args.flags)?;
                plugin.session_mut()?.timeout_ms = args.ms;
                Ok(())
            })
            .operation("time_out_get", |plugin: &mut Self, args: FlagsArgs| {
                check_flags(args.flags)?;
                Ok(plugin.session_mut()?.timeout_ms)
            })
            .operation("systems", |plugin: &mut Self, args: FlagsArgs| {
                check_flags(args.flags)?;
                plugin.session_mut()?;
                Ok(plugin.inventory.systems())
            })
            .operation("pools", Self::pools);
    }
}
