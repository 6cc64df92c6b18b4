//! Test-only scripted MCP peer.
//!
//! Drives the server side of a session over in-memory duplex streams so the
//! session and invoker tests can exercise real wire traffic without a child
//! process.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

use super::transport::StreamTransport;
use super::types::PROTOCOL_VERSION;

/// A transport wired to a scripted peer over an in-memory stream.
pub(crate) fn session_pair() -> (StreamTransport, ScriptedPeer) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (client_reader, client_writer) = tokio::io::split(client_io);
    let transport = StreamTransport::from_io(client_reader, client_writer);
    let (peer_reader, peer_writer) = tokio::io::split(server_io);
    (
        transport,
        ScriptedPeer {
            reader: BufReader::new(peer_reader),
            writer: peer_writer,
        },
    )
}

/// Run a peer script on its own task.
pub(crate) fn spawn_scripted_server<F, Fut>(peer: ScriptedPeer, script: F)
where
    F: FnOnce(ScriptedPeer) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(script(peer));
}

/// A request as seen by the peer.
pub(crate) struct PeerRequest {
    pub id: Value,
    pub method: String,
    pub params: Value,
}

/// The server end of the stream, with line-level send/receive helpers.
pub(crate) struct ScriptedPeer {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl ScriptedPeer {
    /// Read the next request frame, skipping notifications.
    ///
    /// Panics on end-of-stream or malformed client output: the client under
    /// test must only ever write well-formed frames.
    pub async fn read_request(&mut self) -> PeerRequest {
        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .expect("peer read failed");
            assert!(bytes_read > 0, "client closed the stream mid-script");
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame: Value = serde_json::from_str(trimmed).expect("client sent malformed JSON");
            if frame.get("id").is_none() {
                // Notification (e.g. notifications/initialized); skip.
                continue;
            }
            return PeerRequest {
                id: frame["id"].clone(),
                method: frame["method"].as_str().unwrap_or_default().to_string(),
                params: frame.get("params").cloned().unwrap_or(Value::Null),
            };
        }
    }

    /// Send a success response for the given request id.
    pub async fn respond(&mut self, id: &Value, result: Value) {
        self.send_raw(&json!({"jsonrpc": "2.0", "id": id, "result": result}))
            .await;
    }

    /// Send an error response for the given request id.
    pub async fn respond_error(&mut self, id: &Value, code: i64, message: &str) {
        self.send_raw(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }))
        .await;
    }

    /// Send an arbitrary frame.
    pub async fn send_raw(&mut self, frame: &Value) {
        let line = format!("{frame}\n");
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("peer write failed");
        self.writer.flush().await.expect("peer flush failed");
    }

    /// Send a raw line that need not be valid JSON.
    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("peer write failed");
        self.writer.flush().await.expect("peer flush failed");
    }
}

/// Answer the initialize / tools-list handshake with the given tool catalog.
pub(crate) async fn serve_handshake(peer: &mut ScriptedPeer, tools: Value) {
    let init = peer.read_request().await;
    assert_eq!(init.method, "initialize");
    assert_eq!(init.params["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(init.params["capabilities"]["roots"]["listChanged"], true);
    peer.respond(
        &init.id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "scripted", "version": "0.0.0"}
        }),
    )
    .await;

    let list = peer.read_request().await;
    assert_eq!(list.method, "tools/list");
    peer.respond(&list.id, json!({"tools": tools})).await;
}
