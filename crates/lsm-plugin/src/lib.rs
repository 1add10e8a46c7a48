//! Run-loop and RPC protocol for storage management plugins.
//!
//! A storage plugin is a standalone executable that implements one vendor
//! backend. The storage daemon starts it with a single argument: the number
//! of an already-connected Unix stream socket the plugin inherits. This crate
//! turns a plugin implementation into that long-lived service process. It
//! reads framed requests from the inherited connection, dispatches them to the
//! plugin's [`OperationTable`], and writes exactly one response per request.
//!
//! # Architecture
//!
//! - [`mode`] decides between daemon mode (inherited descriptor) and
//!   standalone mode (the [`standalone`] command-line front end).
//! - [`transport`] frames requests and responses on the socket.
//! - [`capability`] maps operation names to typed handlers.
//! - [`dispatch`] owns the plugin instance, tracks the registration
//!   lifecycle and decides how the process terminates.
//! - [`runner`] wires the above together behind [`run`].
//!
//! # Example
//!
//! ```rust,no_run
//! use lsm_plugin::{LsmError, LsmPlugin, NoArguments, OperationTable};
//!
//! #[derive(Default)]
//! struct Demo {
//!     registered: bool,
//! }
//!
//! impl LsmPlugin for Demo {
//!     fn operations(table: &mut OperationTable<Self>) {
//!         table
//!             .operation("plugin_register", |demo: &mut Demo, _: serde_json::Value| {
//!                 demo.registered = true;
//!                 Ok::<_, LsmError>(())
//!             })
//!             .operation("plugin_unregister", |demo: &mut Demo, _: NoArguments| {
//!                 demo.registered = false;
//!                 Ok::<_, LsmError>(())
//!             });
//!     }
//! }
//!
//! fn main() -> std::process::ExitCode {
//!     lsm_plugin::run(std::env::args_os(), || Ok(Demo::default()))
//! }
//! ```

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod mode;
pub mod protocol;
pub mod runner;
pub mod search;
pub mod standalone;
pub mod telemetry;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

pub use self::capability::{
    CapabilityError, LsmPlugin, NoArguments, OperationFailure, OperationTable,
    REGISTER_OPERATION, UNREGISTER_OPERATION,
};
pub use self::dispatch::{DispatchFailure, Dispatcher, LifecycleState, Termination};
pub use self::error::{LsmError, error_number};
pub use self::mode::{InheritedDescriptor, RunMode};
pub use self::protocol::{ErrorPayload, Params, Request, RequestId, Response, codes};
pub use self::runner::{InstantiationError, run, run_with_front_end, serve_connection};
pub use self::search::{SearchableRecord, search_property};
pub use self::standalone::{CommandLineFrontEnd, StandaloneArgs, StandaloneError, StandaloneFrontEnd};
pub use self::transport::{SocketTransport, Transport, TransportError};
