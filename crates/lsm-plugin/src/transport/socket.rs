//! Length-prefixed JSON framing over the inherited Unix stream socket.
//!
//! Each frame is ten ASCII decimal digits holding the zero-padded payload
//! length, followed by that many bytes of UTF-8 JSON.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::protocol::{ErrorPayload, Request, RequestId, Response};

use super::{TRANSPORT_TARGET, Transport, TransportError};

/// Width of the decimal length header preceding each payload.
pub const FRAME_HEADER_LEN: usize = 10;

/// Largest payload accepted in either direction.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// [`Transport`] over a connected Unix stream socket.
#[derive(Debug)]
pub struct SocketTransport {
    stream: Option<UnixStream>,
}

impl SocketTransport {
    /// Wraps an already-connected socket.
    #[must_use]
    pub const fn new(stream: UnixStream) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Takes ownership of a socket descriptor inherited from the parent.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidDescriptor`] if `fd` is not open.
    pub fn from_inherited_fd(fd: RawFd) -> Result<Self, TransportError> {
        // SAFETY: F_GETFD only reads descriptor flags and has no side effects.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags < 0 {
            return Err(TransportError::InvalidDescriptor {
                fd,
                source: Arc::new(io::Error::last_os_error()),
            });
        }
        // SAFETY: the descriptor is open and the parent handed it to this
        // process for its exclusive use; nothing else in the process owns it.
        let stream = unsafe { UnixStream::from_raw_fd(fd) };
        debug!(target: TRANSPORT_TARGET, fd, "adopted inherited connection");
        Ok(Self::new(stream))
    }

    /// Returns `true` once [`Transport::close`] has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream(&mut self) -> Result<&mut UnixStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }

    fn send(&mut self, response: &Response) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(response).map_err(TransportError::Encode)?;
        trace!(
            target: TRANSPORT_TARGET,
            id = %response.id(),
            bytes = payload.len(),
            "writing response frame"
        );
        write_frame(self.stream()?, &payload)
    }
}

impl Transport for SocketTransport {
    fn read_request(&mut self) -> Result<Request, TransportError> {
        let payload = read_frame(self.stream()?)?;
        trace!(target: TRANSPORT_TARGET, bytes = payload.len(), "read request frame");
        let value: Value =
            serde_json::from_slice(&payload).map_err(|error| TransportError::MalformedRequest {
                id: None,
                message: format!("request is not valid JSON: {error}"),
            })?;
        Ok(Request::from_value(value)?)
    }

    fn send_result(&mut self, id: &RequestId, result: &Value) -> Result<(), TransportError> {
        self.send(&Response::success(id.clone(), result.clone()))
    }

    fn send_error(&mut self, id: &RequestId, error: &ErrorPayload) -> Result<(), TransportError> {
        self.send(&Response::error(id.clone(), error.clone()))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(error) = stream.shutdown(Shutdown::Both) {
                debug!(target: TRANSPORT_TARGET, %error, "socket shutdown failed");
            }
        }
    }
}

/// Reads one frame payload.
///
/// # Errors
///
/// Returns [`TransportError::EndOfStream`] when the peer closes the stream,
/// even part-way through a frame, and [`TransportError::Framing`] when the
/// header is not a decimal length or exceeds [`MAX_FRAME_BYTES`].
pub fn read_frame(reader: &mut impl Read) -> Result<Vec<u8>, TransportError> {
    let mut header = [0_u8; FRAME_HEADER_LEN];
    fill(reader, &mut header)?;

    if !header.iter().all(u8::is_ascii_digit) {
        return Err(TransportError::framing(format!(
            "length header {:?} is not decimal",
            String::from_utf8_lossy(&header)
        )));
    }
    let declared = header
        .iter()
        .fold(0_u64, |acc, digit| acc * 10 + u64::from(digit - b'0'));
    let length = usize::try_from(declared)
        .ok()
        .filter(|length| *length <= MAX_FRAME_BYTES)
        .ok_or_else(|| {
            TransportError::framing(format!(
                "frame of {declared} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
            ))
        })?;

    let mut payload = vec![0_u8; length];
    fill(reader, &mut payload)?;
    Ok(payload)
}

/// Writes one frame and flushes the writer.
///
/// # Errors
///
/// Returns [`TransportError::Framing`] when the payload exceeds
/// [`MAX_FRAME_BYTES`] and [`TransportError::Io`] when writing fails.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> Result<(), TransportError> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(TransportError::framing(format!(
            "frame of {} bytes exceeds the {MAX_FRAME_BYTES} byte limit",
            payload.len()
        )));
    }
    let header = format!("{:0width$}", payload.len(), width = FRAME_HEADER_LEN);
    writer
        .write_all(header.as_bytes())
        .map_err(TransportError::io)?;
    writer.write_all(payload).map_err(TransportError::io)?;
    writer.flush().map_err(TransportError::io)
}

/// Fills `buf` completely, retrying on interrupts.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), TransportError> {
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        match reader.read(rest) {
            Ok(0) => return Err(TransportError::EndOfStream),
            Ok(count) => filled += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(TransportError::io(error)),
        }
    }
    Ok(())
}
