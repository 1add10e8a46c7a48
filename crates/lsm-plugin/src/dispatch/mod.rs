//! Request dispatch and registration lifecycle.
//!
//! A [`Dispatcher`] owns one plugin instance and one connection. It serves
//! requests strictly in arrival order and decides how the process ends:
//!
//! - a successful `plugin_unregister` ends the loop gracefully;
//! - a disconnect before registration is a normal shutdown;
//! - a disconnect while registered triggers `plugin_unregister` on the
//!   client's behalf and is reported as abnormal;
//! - any fault outside a single request's handling is reported to the client
//!   when possible and ends the process abnormally.

mod failure;
mod lifecycle;


use tracing::{debug, error, info, warn};

pub use self::failure::{DispatchFailure, PLUGIN_FAULT_MESSAGE};
pub(crate) use self::failure::{invoke_guarded, panic_message};
pub use self::lifecycle::{ABNORMAL_EXIT_STATUS, LifecycleState, Termination};
use crate::capability::{CapabilityError, LsmPlugin, OperationTable, UNREGISTER_OPERATION};
use crate::protocol::{ErrorPayload, Request, RequestId, codes};
use crate::transport::{Transport, TransportError};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::dispatch");

/// Serves requests from one connection against one plugin instance.
#[derive(Debug)]
pub struct Dispatcher<P, T> {
    plugin: P,
    operations: OperationTable<P>,
    transport: T,
    state: LifecycleState,
}

impl<P: LsmPlugin, T: Transport> Dispatcher<P, T> {
    /// Creates a dispatcher using the operations `P` declares.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError`] if the plugin omits a lifecycle operation.
    pub fn for_plugin(plugin: P, transport: T) -> Result<Self, CapabilityError> {
        Ok(Self::new(plugin, OperationTable::for_plugin()?, transport))
    }
}

impl<P, T: Transport> Dispatcher<P, T> {
    /// Creates a dispatcher from an explicit operation table.
    #[must_use]
    pub fn new(plugin: P, operations: OperationTable<P>, transport: T) -> Self {
        Self {
            plugin,
            operations,
            transport,
            state: LifecycleState::default(),
        }
    }

    /// Current registration state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// The plugin instance being served.
    #[must_use]
    pub const fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Serves requests until the connection ends and reports how it ended.
    ///
    /// The transport is closed before this returns.
    pub fn run(&mut self) -> Termination {
        let mut last_id = RequestId::placeholder();
        loop {
            match self.transport.read_request() {
                Ok(request) => {
                    last_id = request.id().clone();
                    if let Err(fault) = self.serve(request) {
                        return self.escaped(&fault, &last_id);
                    }
                    if self.state == LifecycleState::Unregistered {
                        info!(target: DISPATCH_TARGET, "plugin unregistered; shutting down");
                        self.transport.close();
                        return Termination::Graceful;
                    }
                }
                Err(TransportError::EndOfStream) => return self.peer_disconnected(),
                Err(TransportError::MalformedRequest { id, message }) => {
                    last_id = id.unwrap_or_else(RequestId::placeholder);
                    if let Err(fault) = self.reject_malformed(&last_id, message) {
                        return self.escaped(&fault, &last_id);
                    }
                }
                Err(fault) => return self.escaped(&fault, &last_id),
            }
        }
    }

    fn serve(&mut self, request: Request) -> Result<(), TransportError> {
        let (method, id, params) = request.into_parts();
        debug!(target: DISPATCH_TARGET, %method, %id, "dispatching request");
        match invoke_guarded(&self.operations, &mut self.plugin, &method, params) {
            Ok(result) => {
                self.state = self.state.after_success(&method);
                self.transport.send_result(&id, &result)
            }
            Err(failure) => {
                match &failure {
                    DispatchFailure::Fault { diagnostic, .. } => {
                        error!(target: DISPATCH_TARGET, %method, %id, %diagnostic, "plugin fault");
                    }
                    DispatchFailure::Unsupported { .. } => {
                        warn!(target: DISPATCH_TARGET, %method, %id, "unsupported operation");
                    }
                    other => {
                        debug!(target: DISPATCH_TARGET, %method, %id, error = %other, "operation failed");
                    }
                }
                self.transport.send_error(&id, &failure.to_payload())
            }
        }
    }

    fn reject_malformed(&mut self, id: &RequestId, message: String) -> Result<(), TransportError> {
        warn!(target: DISPATCH_TARGET, %id, %message, "rejecting malformed request");
        self.transport
            .send_error(id, &ErrorPayload::new(codes::PARSE_ERROR, message))
    }

    fn peer_disconnected(&mut self) -> Termination {
        self.transport.close();
        if !self.state.needs_cleanup() {
            info!(target: DISPATCH_TARGET, "client disconnected");
            return Termination::PeerDisconnected;
        }

        warn!(
            target: DISPATCH_TARGET,
            "client disconnected without unregistering; releasing plugin resources"
        );
        match invoke_guarded(&self.operations, &mut self.plugin, UNREGISTER_OPERATION, None) {
            Ok(_) => self.state = LifecycleState::Unregistered,
            Err(failure) => {
                error!(target: DISPATCH_TARGET, error = %failure, "cleanup unregister failed");
            }
        }
        Termination::AbandonedRegistration
    }

    fn escaped(&mut self, fault: &TransportError, last_id: &RequestId) -> Termination {
        error!(target: DISPATCH_TARGET, error = %fault, "connection fault; terminating");
        let payload = ErrorPayload::new(codes::PLUGIN_FAULT, PLUGIN_FAULT_MESSAGE)
            .with_data(serde_json::Value::String(fault.to_string()));
        if let Err(send_error) = self.transport.send_error(last_id, &payload) {
            debug!(target: DISPATCH_TARGET, error = %send_error, "fault report not delivered");
        }
        self.transport.close();
        Termination::Fault
    }
}
