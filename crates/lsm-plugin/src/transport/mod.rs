//! Connection-scoped message channel between the plugin and its client.
//!
//! The [`Transport`] trait is the seam the dispatcher talks through: read one
//! request, send one result or error, close. [`SocketTransport`] implements
//! it over the Unix stream socket inherited from the storage daemon.

mod socket;

#[cfg(test)]
mod tests;

use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::protocol::{ErrorPayload, MalformedRequest, Request, RequestId};

pub use self::socket::{FRAME_HEADER_LEN, MAX_FRAME_BYTES, SocketTransport, read_frame, write_frame};

/// Tracing target for transport operations.
pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::transport");

/// A channel yielding one request at a time and accepting one response per
/// request.
pub trait Transport {
    /// Blocks until a full request is available.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::EndOfStream`] when the peer disconnects,
    /// [`TransportError::MalformedRequest`] when a frame arrived but its
    /// content cannot be interpreted, and other variants when the connection
    /// is no longer usable.
    fn read_request(&mut self) -> Result<Request, TransportError>;

    /// Sends a success response.
    ///
    /// # Errors
    ///
    /// Any failure is fatal to the connection.
    fn send_result(&mut self, id: &RequestId, result: &Value) -> Result<(), TransportError>;

    /// Sends an error response.
    ///
    /// # Errors
    ///
    /// Any failure is fatal to the connection.
    fn send_error(&mut self, id: &RequestId, error: &ErrorPayload) -> Result<(), TransportError>;

    /// Releases the connection. Calling it more than once is harmless.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_request(&mut self) -> Result<Request, TransportError> {
        (**self).read_request()
    }

    fn send_result(&mut self, id: &RequestId, result: &Value) -> Result<(), TransportError> {
        (**self).send_result(id, result)
    }

    fn send_error(&mut self, id: &RequestId, error: &ErrorPayload) -> Result<(), TransportError> {
        (**self).send_error(id, error)
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Errors raised by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection.
    #[error("peer closed the connection")]
    EndOfStream,

    /// A frame arrived but its content is not a valid request.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Identifier recovered from the payload, if any.
        id: Option<RequestId>,
        /// Description of the defect.
        message: String,
    },

    /// The byte stream lost frame synchronisation.
    #[error("invalid frame: {message}")]
    Framing {
        /// Description of the framing violation.
        message: String,
    },

    /// Reading from or writing to the connection failed.
    #[error("transport I/O failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// The inherited descriptor does not refer to an open file.
    #[error("descriptor {fd} is not usable: {source}")]
    InvalidDescriptor {
        /// Descriptor number supplied on the command line.
        fd: RawFd,
        /// Error reported by the descriptor probe.
        #[source]
        source: Arc<io::Error>,
    },

    /// The transport was already closed.
    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` when the failure concerns a single request and the
    /// connection remains usable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRequest { .. })
    }

    pub(crate) fn io(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }

    pub(crate) fn framing(message: impl Into<String>) -> Self {
        Self::Framing {
            message: message.into(),
        }
    }
}

impl From<MalformedRequest> for TransportError {
    fn from(rejection: MalformedRequest) -> Self {
        let (id, message) = rejection.into_parts();
        Self::MalformedRequest { id, message }
    }
}
