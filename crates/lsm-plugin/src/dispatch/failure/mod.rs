//! Classification of per-request failures and their wire payloads.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use thiserror::Error;

use crate::capability::{OperationFailure, OperationTable};
use crate::error::LsmError;
use crate::protocol::{ErrorPayload, Params, codes};

/// Message sent to the client when the plugin faults.
pub const PLUGIN_FAULT_MESSAGE: &str = "Unhandled exception in plug-in";

/// A request that produced an error response instead of a result.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    /// The params could not be bound to the operation's arguments.
    #[error("invalid arguments for '{method}': {message}")]
    InvalidArguments {
        /// Operation name.
        method: String,
        /// Binding failure description.
        message: String,
    },

    /// The plugin does not declare the operation.
    #[error("Unsupported operation '{method}'")]
    Unsupported {
        /// Requested operation name.
        method: String,
    },

    /// The plugin rejected the request.
    #[error(transparent)]
    Domain(LsmError),

    /// The operation panicked or returned an unencodable value.
    #[error("plugin fault in '{method}': {diagnostic}")]
    Fault {
        /// Operation name.
        method: String,
        /// Diagnostic text forwarded to the client as error data.
        diagnostic: String,
    },
}

impl DispatchFailure {
    /// Builds the error payload reported to the client.
    ///
    /// Domain failures keep the plugin's code, message and data untouched.
    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Self::InvalidArguments { .. } => ErrorPayload::new(codes::PARSE_ERROR, self.to_string()),
            Self::Unsupported { .. } => {
                ErrorPayload::new(codes::UNSUPPORTED_OPERATION, self.to_string())
            }
            Self::Domain(error) => ErrorPayload::from(error.clone()),
            Self::Fault { diagnostic, .. } => {
                ErrorPayload::new(codes::PLUGIN_FAULT, PLUGIN_FAULT_MESSAGE)
                    .with_data(Value::String(diagnostic.clone()))
            }
        }
    }

    fn from_operation(failure: OperationFailure) -> Self {
        match failure {
            OperationFailure::InvalidArguments { method, message } => {
                Self::InvalidArguments { method, message }
            }
            OperationFailure::Domain(error) => Self::Domain(error),
            OperationFailure::Encode { method, source } => Self::Fault {
                method,
                diagnostic: format!("result could not be encoded: {source}"),
            },
        }
    }
}

/// Invokes `method` on the plugin, converting panics into plugin faults.
pub(crate) fn invoke_guarded<P>(
    operations: &OperationTable<P>,
    plugin: &mut P,
    method: &str,
    params: Option<Params>,
) -> Result<Value, DispatchFailure> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        operations.invoke(plugin, method, params)
    }));

    match outcome {
        Ok(Some(result)) => result.map_err(DispatchFailure::from_operation),
        Ok(None) => Err(DispatchFailure::Unsupported {
            method: method.to_owned(),
        }),
        Err(payload) => Err(DispatchFailure::Fault {
            method: method.to_owned(),
            diagnostic: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

/// Extracts the text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}
