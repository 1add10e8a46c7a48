//! Process entry point for plugin executables.
//!
//! [`run`] loads configuration, installs logging, decides the run mode and
//! either serves the inherited connection or hands the arguments to the
//! standalone front end.


use std::ffi::OsString;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use lsm_config::Config;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::capability::{CapabilityError, LsmPlugin, OperationTable};
use crate::dispatch::{Dispatcher, Termination, panic_message};
use crate::error::LsmError;
use crate::mode::{InheritedDescriptor, RunMode};
use crate::protocol::{ErrorPayload, RequestId, codes};
use crate::standalone::{CommandLineFrontEnd, StandaloneFrontEnd};
use crate::telemetry;
use crate::transport::{SocketTransport, Transport};

const RUNNER_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::runner");

/// Why a plugin instance could not be created.
#[derive(Debug, Error)]
pub enum InstantiationError {
    /// The constructor reported an error.
    #[error("{0}")]
    Constructor(#[source] LsmError),
    /// The constructor panicked.
    #[error("constructor panicked: {0}")]
    Panicked(String),
    /// The plugin's operation table is incomplete.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Runs a plugin executable and returns its exit code.
///
/// `args` is the full argument vector, program name included. The
/// constructor is called exactly once, in either mode.
pub fn run<P, C, I>(args: I, constructor: C) -> ExitCode
where
    P: LsmPlugin,
    C: FnOnce() -> Result<P, LsmError>,
    I: IntoIterator<Item = OsString>,
{
    run_with_front_end(args, constructor, &CommandLineFrontEnd)
}

/// Like [`run`], with a custom front end for standalone invocations.
pub fn run_with_front_end<P, C, I, F>(args: I, constructor: C, front_end: &F) -> ExitCode
where
    P: LsmPlugin,
    C: FnOnce() -> Result<P, LsmError>,
    I: IntoIterator<Item = OsString>,
    F: StandaloneFrontEnd + ?Sized,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    initialise_logging(arguments.first());

    match RunMode::detect(&arguments) {
        RunMode::Daemon { descriptor } => {
            let termination = run_daemon(&descriptor, constructor);
            info!(
                target: RUNNER_TARGET,
                ?termination,
                status = termination.exit_status(),
                "plugin exiting"
            );
            termination.exit_code()
        }
        RunMode::Standalone => front_end.run(&arguments, constructor),
    }
}

/// Constructs the plugin and serves `transport` until the session ends.
///
/// A construction failure is reported on the transport with
/// [`codes::INSTANTIATION_ERROR`] and the placeholder id, since no request
/// has been read yet.
pub fn serve_connection<P, T, C>(mut transport: T, constructor: C) -> Termination
where
    P: LsmPlugin,
    T: Transport,
    C: FnOnce() -> Result<P, LsmError>,
{
    match instantiate(constructor) {
        Ok((plugin, operations)) => {
            debug!(target: RUNNER_TARGET, ?operations, "plugin constructed");
            Dispatcher::new(plugin, operations, transport).run()
        }
        Err(failure) => {
            error!(target: RUNNER_TARGET, error = %failure, "plugin construction failed");
            let payload = ErrorPayload::new(
                codes::INSTANTIATION_ERROR,
                format!("Error instantiating plug-in {failure}"),
            );
            if let Err(send_error) = transport.send_error(&RequestId::placeholder(), &payload) {
                debug!(target: RUNNER_TARGET, error = %send_error, "instantiation error not delivered");
            }
            transport.close();
            Termination::ConstructionFailed
        }
    }
}

/// Calls the constructor behind a panic guard and builds the operation table.
pub(crate) fn instantiate<P, C>(constructor: C) -> Result<(P, OperationTable<P>), InstantiationError>
where
    P: LsmPlugin,
    C: FnOnce() -> Result<P, LsmError>,
{
    let plugin = panic::catch_unwind(AssertUnwindSafe(constructor))
        .map_err(|payload| InstantiationError::Panicked(panic_message(payload.as_ref())))?
        .map_err(InstantiationError::Constructor)?;
    let operations = OperationTable::for_plugin()?;
    Ok((plugin, operations))
}

fn run_daemon<P, C>(descriptor: &InheritedDescriptor, constructor: C) -> Termination
where
    P: LsmPlugin,
    C: FnOnce() -> Result<P, LsmError>,
{
    let Some(fd) = descriptor.raw_fd() else {
        error!(target: RUNNER_TARGET, %descriptor, "inherited descriptor is out of range");
        return Termination::ConnectionUnavailable;
    };
    match SocketTransport::from_inherited_fd(fd) {
        Ok(transport) => {
            info!(target: RUNNER_TARGET, fd, "serving inherited connection");
            serve_connection(transport, constructor)
        }
        Err(failure) => {
            error!(target: RUNNER_TARGET, fd, error = %failure, "cannot adopt inherited connection");
            Termination::ConnectionUnavailable
        }
    }
}

fn initialise_logging(program: Option<&OsString>) {
    let program_name = program
        .cloned()
        .unwrap_or_else(|| OsString::from(env!("CARGO_PKG_NAME")));
    let (config, load_error) = match Config::load_for_program(program_name) {
        Ok(loaded) => (loaded, None),
        Err(failure) => (Config::default(), Some(failure)),
    };

    if let Err(failure) = telemetry::initialise(&config) {
        writeln!(io::stderr().lock(), "logging unavailable: {failure}").ok();
    }
    if let Some(failure) = load_error {
        warn!(target: RUNNER_TARGET, error = %failure, "configuration ignored; using defaults");
    }
}
