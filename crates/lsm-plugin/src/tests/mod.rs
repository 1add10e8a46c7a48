//! Crate-level integration and BDD tests.

use std::io;
use std::os::unix::net::UnixStream;
use std::thread;

use serde_json::{Value, json};

use crate::capability::{LsmPlugin, NoArguments, OperationTable};
use crate::dispatch::Termination;
use crate::error::LsmError;
use crate::runner::serve_connection;
use crate::transport::{SocketTransport, read_frame, write_frame};


#[derive(Default)]
struct Counter {
    total: i64,
}

#[derive(serde::Deserialize)]
struct Add {
    amount: i64,
}

impl LsmPlugin for Counter {
    fn operations(table: &mut OperationTable<Self>) {
        table
            .operation("plugin_register", |_: &mut Self, _: Value| Ok::<_, LsmError>(()))
            .operation("plugin_unregister", |_: &mut Self, _: NoArguments| {
                Ok::<_, LsmError>(())
            })
            .operation("add", |counter: &mut Self, args: Add| {
                counter.total += args.amount;
                Ok::<_, LsmError>(counter.total)
            });
    }
}

fn exchange(client: &mut UnixStream, request: &Value) -> io::Result<Value> {
    let payload = serde_json::to_vec(request)?;
    write_frame(client, &payload).map_err(io::Error::other)?;
    let reply = read_frame(client).map_err(io::Error::other)?;
    Ok(serde_json::from_slice(&reply)?)
}

#[test]
fn end_to_end_session_over_a_socket_pair() {
    let (mut client, server) = UnixStream::pair().expect("socket pair");
    let plugin_side = thread::spawn(move || {
        serve_connection(SocketTransport::new(server), || Ok(Counter::default()))
    });

    let requests = [
        json!({"method": "plugin_register", "id": 1, "params": {"uri": "counter://"}}),
        json!({"method": "add", "id": 2, "params": {"amount": 5}}),
        json!({"method": "add", "id": "three", "params": {"amount": 2}}),
        json!({"method": "plugin_unregister", "id": 4}),
    ];
    let replies: Vec<Value> = requests
        .iter()
        .map(|request| exchange(&mut client, request).expect("exchange"))
        .collect();

    assert_eq!(
        replies,
        [
            json!({"id": 1, "result": null}),
            json!({"id": 2, "result": 5}),
            json!({"id": "three", "result": 7}),
            json!({"id": 4, "result": null}),
        ]
    );
    let termination = plugin_side.join().expect("plugin thread");
    assert_eq!(termination, Termination::Graceful);
}
