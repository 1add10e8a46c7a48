//! In-memory doubles for exercising plugins without a socket.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use crate::protocol::{ErrorPayload, Params, Request, RequestId, Response};
use crate::transport::{Transport, TransportError};

/// A transport that replays a scripted sequence of inbound events and
/// records every response.
///
/// Once the script is exhausted, reads report end of stream.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    inbound: VecDeque<Result<Request, TransportError>>,
    sent: Vec<Response>,
    close_calls: usize,
    failing_sends: bool,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request.
    pub fn push_request(&mut self, request: Request) -> &mut Self {
        self.inbound.push_back(Ok(request));
        self
    }

    /// Queues a request built from its parts.
    pub fn push_call(
        &mut self,
        method: &str,
        id: i64,
        params: Option<Params>,
    ) -> &mut Self {
        self.push_request(Request::new(method, RequestId::from(id), params))
    }

    /// Queues a read failure.
    pub fn push_failure(&mut self, failure: TransportError) -> &mut Self {
        self.inbound.push_back(Err(failure));
        self
    }

    /// Makes every subsequent send fail with a broken pipe.
    pub fn fail_sends(&mut self) -> &mut Self {
        self.failing_sends = true;
        self
    }

    /// Responses sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> &[Response] {
        &self.sent
    }

    /// Number of scripted events not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Returns `true` once `close` has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.close_calls > 0
    }

    /// Number of `close` calls observed.
    #[must_use]
    pub const fn close_calls(&self) -> usize {
        self.close_calls
    }

    fn record(&mut self, response: Response) -> Result<(), TransportError> {
        if self.failing_sends {
            return Err(TransportError::io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        self.sent.push(response);
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn read_request(&mut self) -> Result<Request, TransportError> {
        self.inbound
            .pop_front()
            .unwrap_or(Err(TransportError::EndOfStream))
    }

    fn send_result(&mut self, id: &RequestId, result: &Value) -> Result<(), TransportError> {
        self.record(Response::success(id.clone(), result.clone()))
    }

    fn send_error(&mut self, id: &RequestId, error: &ErrorPayload) -> Result<(), TransportError> {
        self.record(Response::error(id.clone(), error.clone()))
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }
}

/// Converts a `json!` object literal into request params.
///
/// Non-object values yield empty params.
#[must_use]
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// An in-memory log sink that stands in for standard error.
///
/// Clones share one buffer, so a test keeps a handle while the subscriber
/// writes through another.
#[derive(Debug, Clone, Default)]
pub struct CapturedLog {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLog {
    /// Everything written so far, decoded lossily.
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
