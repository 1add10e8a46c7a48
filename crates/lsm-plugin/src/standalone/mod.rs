//! Standalone invocation of a plugin from the command line.
//!
//! When a plugin executable is not launched by the daemon, the runner hands
//! its arguments to a [`StandaloneFrontEnd`]. [`CommandLineFrontEnd`] runs one
//! operation against a freshly registered plugin and prints the JSON result.


use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::capability::{LsmPlugin, OperationTable, REGISTER_OPERATION, UNREGISTER_OPERATION};
use crate::dispatch::{DispatchFailure, invoke_guarded};
use crate::error::LsmError;
use crate::protocol::Params;
use crate::runner::{InstantiationError, instantiate};

const STANDALONE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::standalone");

/// Exit status for a failed standalone invocation.
pub const STANDALONE_FAILURE_STATUS: u8 = 1;

/// Default operation timeout, in milliseconds, passed to `plugin_register`.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Handles invocations that did not come from the daemon.
pub trait StandaloneFrontEnd {
    /// Runs the plugin for a human or script using the full argument vector.
    fn run<P, C>(&self, args: &[OsString], constructor: C) -> ExitCode
    where
        P: LsmPlugin,
        C: FnOnce() -> Result<P, LsmError>;
}

/// Command-line arguments accepted in standalone mode.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(about = "Invoke a single storage plugin operation")]
pub struct StandaloneArgs {
    /// Connection URI passed to `plugin_register`.
    #[arg(short, long)]
    pub uri: String,
    /// Password passed to `plugin_register`.
    #[arg(short = 'P', long)]
    pub password: Option<String>,
    /// Operation timeout in milliseconds.
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,
    /// Operation arguments as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,
    /// Operation to invoke, for example `systems`.
    pub operation: String,
}

/// Failures reported by the standalone front end.
#[derive(Debug, Error)]
pub enum StandaloneError {
    /// The plugin could not be created.
    #[error("cannot instantiate plugin: {0}")]
    Instantiation(#[from] InstantiationError),
    /// The `--params` value is not a JSON object.
    #[error("--params must be a JSON object: {0}")]
    Params(String),
    /// An operation returned an error.
    #[error("{method} failed: {failure}")]
    Operation {
        /// Operation that failed.
        method: String,
        /// Failure reported by the dispatcher.
        #[source]
        failure: DispatchFailure,
    },
    /// The result could not be rendered.
    #[error("cannot render result: {0}")]
    Render(#[source] serde_json::Error),
}

/// Clap-based front end: register, invoke one operation, unregister.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLineFrontEnd;

impl CommandLineFrontEnd {
    /// Runs with explicit output streams and returns the exit status.
    pub fn run_with_io<P, C>(
        self,
        args: &[OsString],
        constructor: C,
        stdout: &mut impl Write,
        stderr: &mut impl Write,
    ) -> u8
    where
        P: LsmPlugin,
        C: FnOnce() -> Result<P, LsmError>,
    {
        let parsed = match StandaloneArgs::try_parse_from(args) {
            Ok(parsed) => parsed,
            Err(error) => {
                let sink: &mut dyn Write = if error.use_stderr() { stderr } else { stdout };
                write!(sink, "{}", error.render()).ok();
                return if error.use_stderr() {
                    STANDALONE_FAILURE_STATUS
                } else {
                    0
                };
            }
        };

        match invoke_once(&parsed, constructor) {
            Ok(rendered) => {
                writeln!(stdout, "{rendered}").ok();
                0
            }
            Err(failure) => {
                writeln!(stderr, "{failure}").ok();
                STANDALONE_FAILURE_STATUS
            }
        }
    }
}

impl StandaloneFrontEnd for CommandLineFrontEnd {
    fn run<P, C>(&self, args: &[OsString], constructor: C) -> ExitCode
    where
        P: LsmPlugin,
        C: FnOnce() -> Result<P, LsmError>,
    {
        let status = self.run_with_io(
            args,
            constructor,
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        );
        ExitCode::from(status)
    }
}

fn invoke_once<P, C>(args: &StandaloneArgs, constructor: C) -> Result<String, StandaloneError>
where
    P: LsmPlugin,
    C: FnOnce() -> Result<P, LsmError>,
{
    let operation_params = parse_params(args.params.as_deref())?;
    let (mut plugin, operations) = instantiate(constructor)?;

    call(&operations, &mut plugin, REGISTER_OPERATION, Some(register_params(args)))?;
    let outcome = call(&operations, &mut plugin, &args.operation, operation_params);
    if let Err(failure) = call(&operations, &mut plugin, UNREGISTER_OPERATION, None) {
        warn!(target: STANDALONE_TARGET, error = %failure, "unregister failed");
    }

    serde_json::to_string_pretty(&outcome?).map_err(StandaloneError::Render)
}

fn call<P>(
    operations: &OperationTable<P>,
    plugin: &mut P,
    method: &str,
    params: Option<Params>,
) -> Result<Value, StandaloneError> {
    invoke_guarded(operations, plugin, method, params).map_err(|failure| {
        StandaloneError::Operation {
            method: method.to_owned(),
            failure,
        }
    })
}

fn register_params(args: &StandaloneArgs) -> Params {
    let mut params = Params::new();
    params.insert(String::from("uri"), json!(args.uri));
    params.insert(String::from("password"), json!(args.password));
    params.insert(String::from("timeout"), json!(args.timeout));
    params.insert(String::from("flags"), json!(0));
    params
}

fn parse_params(raw: Option<&str>) -> Result<Option<Params>, StandaloneError> {
    let Some(text) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(StandaloneError::Params(format!("got {other}"))),
        Err(error) => Err(StandaloneError::Params(error.to_string())),
    }
}
