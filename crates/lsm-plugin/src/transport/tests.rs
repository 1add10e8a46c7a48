//! Unit tests for framing and the socket transport.

use std::io::{Cursor, Read, Write};
use std::os::unix::net::UnixStream;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::protocol::Response;

fn frame(payload: &str) -> Vec<u8> {
    let mut bytes = format!("{:010}", payload.len()).into_bytes();
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

struct SocketPair {
    transport: SocketTransport,
    peer: UnixStream,
}

impl SocketPair {
    fn send_raw(&mut self, bytes: &[u8]) {
        self.peer.write_all(bytes).expect("peer write");
    }

    fn receive(&mut self) -> Response {
        let payload = read_frame(&mut self.peer).expect("peer read");
        serde_json::from_slice(&payload).expect("response JSON")
    }
}

#[fixture]
fn pair() -> SocketPair {
    let (local, peer) = UnixStream::pair().expect("socket pair");
    SocketPair {
        transport: SocketTransport::new(local),
        peer,
    }
}

#[test]
fn write_frame_zero_pads_the_length() {
    let mut output = Vec::new();
    write_frame(&mut output, b"{}").expect("write");
    assert_eq!(output, b"0000000002{}");
}

#[test]
fn read_frame_returns_the_payload() {
    let mut input = Cursor::new(frame(r#"{"id":1}"#));
    let payload = read_frame(&mut input).expect("read");
    assert_eq!(payload, br#"{"id":1}"#);
}

#[test]
fn consecutive_frames_are_read_in_order() {
    let mut bytes = frame("[1]");
    bytes.extend(frame("[2]"));
    let mut input = Cursor::new(bytes);
    assert_eq!(read_frame(&mut input).expect("first"), b"[1]");
    assert_eq!(read_frame(&mut input).expect("second"), b"[2]");
}

#[rstest]
#[case::empty(Vec::new())]
#[case::partial_header(b"00000".to_vec())]
#[case::partial_payload(b"0000000010{\"id\"".to_vec())]
fn truncated_input_is_end_of_stream(#[case] bytes: Vec<u8>) {
    let mut input = Cursor::new(bytes);
    let result = read_frame(&mut input);
    assert!(
        matches!(result, Err(TransportError::EndOfStream)),
        "expected end of stream, got {result:?}"
    );
}

#[test]
fn non_decimal_header_is_a_framing_error() {
    let mut input = Cursor::new(b"00000000x2{}".to_vec());
    let result = read_frame(&mut input);
    assert!(matches!(result, Err(TransportError::Framing { .. })));
}

#[test]
fn oversized_header_is_rejected() {
    let mut input = Cursor::new(b"9999999999".to_vec());
    let result = read_frame(&mut input);
    assert!(matches!(result, Err(TransportError::Framing { .. })));
}

#[rstest]
fn socket_transport_reads_requests(mut pair: SocketPair) {
    pair.send_raw(&frame(
        r#"{"method":"plugin_info","id":3,"params":{"flags":0}}"#,
    ));
    let request = pair.transport.read_request().expect("request");
    assert_eq!(request.method(), "plugin_info");
    assert_eq!(request.id(), &RequestId::from(3));
}

#[rstest]
fn undecodable_payload_is_recoverable(mut pair: SocketPair) {
    pair.send_raw(&frame("not json"));
    let error = pair.transport.read_request().expect_err("malformed");
    assert!(error.is_recoverable(), "expected recoverable, got {error:?}");
    assert!(matches!(
        error,
        TransportError::MalformedRequest { id: None, .. }
    ));
}

#[rstest]
fn structurally_invalid_request_keeps_its_id(mut pair: SocketPair) {
    pair.send_raw(&frame(r#"{"id":9,"params":{}}"#));
    let error = pair.transport.read_request().expect_err("malformed");
    match error {
        TransportError::MalformedRequest { id, .. } => {
            assert_eq!(id, Some(RequestId::from(9)));
        }
        other => panic!("expected malformed request, got {other:?}"),
    }
}

#[rstest]
fn peer_disconnect_is_end_of_stream(pair: SocketPair) {
    let SocketPair {
        mut transport,
        peer,
    } = pair;
    drop(peer);
    let result = transport.read_request();
    assert!(matches!(result, Err(TransportError::EndOfStream)));
}

#[rstest]
fn results_are_framed_with_the_request_id(mut pair: SocketPair) {
    pair.transport
        .send_result(&RequestId::from(11), &json!({"version": "1.0"}))
        .expect("send");
    let response = pair.receive();
    assert_eq!(response, Response::success(RequestId::from(11), json!({"version": "1.0"})));
}

#[rstest]
fn errors_are_framed_with_the_request_id(mut pair: SocketPair) {
    let payload = ErrorPayload::new(51, "bad uri");
    pair.transport
        .send_error(&RequestId::from(12), &payload)
        .expect("send");
    let response = pair.receive();
    assert_eq!(response, Response::error(RequestId::from(12), payload));
}

#[rstest]
fn close_is_idempotent_and_signals_the_peer(mut pair: SocketPair) {
    pair.transport.close();
    pair.transport.close();
    assert!(pair.transport.is_closed());

    let mut buffer = Vec::new();
    let read = pair.peer.read_to_end(&mut buffer).expect("peer read");
    assert_eq!(read, 0);
}

#[rstest]
fn closed_transport_refuses_io(mut pair: SocketPair) {
    pair.transport.close();
    let result = pair.transport.send_result(&RequestId::from(1), &json!(null));
    assert!(matches!(result, Err(TransportError::Closed)));
}

#[test]
fn invalid_descriptor_is_rejected() {
    // Descriptor numbers this high are never allocated in the test process.
    let result = SocketTransport::from_inherited_fd(987_654);
    assert!(matches!(
        result,
        Err(TransportError::InvalidDescriptor { fd: 987_654, .. })
    ));
}
