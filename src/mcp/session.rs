//! MCP session: handshake, request correlation, and frame dispatch.
//!
//! A session owns the transport and runs a single dispatcher task that reads
//! every frame off the stream and routes it to the caller waiting on its id.
//! Callers never touch the read side: each `call` registers a one-shot slot
//! in the pending table, writes its request, and parks on its own slot until
//! the dispatcher fulfils it or the timeout elapses. Foreign responses and
//! notifications are dropped without disturbing anyone.
//!
//! Lifecycle: `Uninitialized → Handshaking → Ready → Closed`. The handshake
//! (`initialize`, `notifications/initialized`, `tools/list`) runs inside
//! [`McpSession::connect`]; tool calls are only accepted once `Ready`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::errors::McpError;
use super::transport::StreamTransport;
use super::types::{
    ClientInfo, IncomingFrame, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    RequestId, ToolDescriptor, ToolsListResult, PROTOCOL_VERSION,
};

// ─── Session Options ─────────────────────────────────────────────────────────

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Per-call response budget.
    pub call_timeout: Duration,
    /// Budget for each handshake step (initialize, tools/list).
    pub handshake_timeout: Duration,
    /// Consecutive malformed frames tolerated before the dispatcher gives up.
    pub malformed_frame_tolerance: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(120),
            handshake_timeout: Duration::from_secs(30),
            malformed_frame_tolerance: 8,
        }
    }
}

// ─── Session State ───────────────────────────────────────────────────────────

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Uninitialized,
    Handshaking,
    Ready,
    Closed,
}

impl SessionState {
    fn as_str(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Handshaking => "handshaking",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        }
    }
}

// ─── Shared Core ─────────────────────────────────────────────────────────────

type ResponseSlot = oneshot::Sender<Result<Value, McpError>>;

/// State shared between callers and the dispatcher task.
struct Shared {
    transport: StreamTransport,
    pending: Mutex<HashMap<RequestId, ResponseSlot>>,
    state: Mutex<SessionState>,
    next_id: AtomicU64,
}

impl Shared {
    fn new(transport: StreamTransport) -> Self {
        Self {
            transport,
            pending: Mutex::new(HashMap::new()),
            state: Mutex::new(SessionState::Uninitialized),
            next_id: AtomicU64::new(1),
        }
    }

    fn state(&self) -> SessionState {
        *self.state.lock().expect("session state lock poisoned")
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().expect("session state lock poisoned") = state;
    }

    /// Cancel every outstanding request with the given error and mark the
    /// session closed. The error constructor runs once per cancelled slot so
    /// callers can tell a noisy peer (protocol give-up) from a clean
    /// hang-up (stream closed).
    fn close_with(&self, make_error: impl Fn() -> McpError) {
        self.set_state(SessionState::Closed);
        let drained: Vec<ResponseSlot> = {
            let mut pending = self.pending.lock().expect("pending table lock poisoned");
            pending.drain().map(|(_, slot)| slot).collect()
        };
        for slot in drained {
            let _ = slot.send(Err(make_error()));
        }
    }

    /// Close with a plain cancellation error.
    fn close_cancelled(&self, reason: &str) {
        self.close_with(|| McpError::Closed {
            reason: reason.to_string(),
        });
    }

    /// Send one request and wait for its response.
    ///
    /// On timeout the pending entry is removed first, so a late response
    /// finds no match and falls into the dispatcher's drop path.
    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, McpError> {
        if self.state() == SessionState::Closed {
            return Err(McpError::Closed {
                reason: "session already closed".into(),
            });
        }

        let id = RequestId::Num(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending table lock poisoned")
            .insert(id.clone(), tx);

        let frame = JsonRpcRequest::new(id.clone(), method, params);
        if let Err(e) = self.transport.send(&frame).await {
            self.remove_pending(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // The dispatcher dropped the slot without fulfilling it; only
            // possible during teardown.
            Ok(Err(_)) => Err(McpError::Closed {
                reason: "session torn down while waiting for a response".into(),
            }),
            Err(_) => {
                self.remove_pending(&id);
                Err(McpError::Timeout {
                    method: method.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    fn remove_pending(&self, id: &RequestId) {
        self.pending
            .lock()
            .expect("pending table lock poisoned")
            .remove(id);
    }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// The single reader loop. Decodes frames and routes them; never blocks on
/// caller-side work.
async fn run_dispatcher(shared: Arc<Shared>, strike_limit: u32) {
    let mut strikes: u32 = 0;
    loop {
        let line = match shared.transport.recv().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("server closed the stream");
                shared.close_cancelled("server closed the stream");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport failure, closing session");
                shared.close_cancelled(&format!("transport failure: {e}"));
                return;
            }
        };

        let frame: IncomingFrame = match serde_json::from_str(&line) {
            Ok(frame) => {
                strikes = 0;
                frame
            }
            Err(e) => {
                strikes += 1;
                tracing::warn!(error = %e, strikes, "dropping malformed frame");
                if strikes > strike_limit {
                    // A peer this noisy cannot be trusted to keep framing
                    // straight; give up with a protocol error, not a plain
                    // cancellation.
                    shared.close_with(|| McpError::Protocol {
                        reason: format!(
                            "{strikes} consecutive malformed frames exceeded the tolerance of {strike_limit}"
                        ),
                    });
                    return;
                }
                continue;
            }
        };

        route_frame(&shared, frame);
    }
}

/// Route one decoded frame: fulfil a pending request, or drop it.
fn route_frame(shared: &Shared, frame: IncomingFrame) {
    let Some(id) = frame.id else {
        // Notification. No handler is registered; drop it.
        tracing::trace!(
            method = frame.method.as_deref().unwrap_or("<none>"),
            "dropping notification"
        );
        return;
    };

    let slot = shared
        .pending
        .lock()
        .expect("pending table lock poisoned")
        .remove(&id);

    match slot {
        Some(slot) => {
            let outcome = match (frame.error, frame.result) {
                (Some(err), _) => Err(McpError::Server {
                    code: err.code,
                    message: err.message,
                    data: err.data,
                }),
                (None, Some(result)) => Ok(result),
                // A response must carry one of the two; fulfilling with
                // null would hide a broken peer from the caller.
                (None, None) => Err(McpError::Protocol {
                    reason: format!("response {id} carried neither result nor error"),
                }),
            };
            // The caller may have timed out between removal and here; a
            // failed send is not an error.
            let _ = slot.send(outcome);
        }
        // Stale or foreign response (e.g. arrived after the caller timed
        // out, or a server-initiated request we don't serve). Dropped.
        None => tracing::debug!(%id, "dropping frame with no matching request"),
    }
}

// ─── McpSession ──────────────────────────────────────────────────────────────

/// An initialized MCP session over a single transport.
///
/// Created by [`connect`](Self::connect), which performs the full handshake.
/// Dropping the session aborts the dispatcher and kills the server process
/// (the transport spawns it with kill-on-drop).
pub struct McpSession {
    shared: Arc<Shared>,
    dispatcher: JoinHandle<()>,
    tools: HashMap<String, ToolDescriptor>,
    call_timeout: Duration,
}

impl McpSession {
    /// Open a session: spawn the dispatcher, run the initialize handshake,
    /// emit `notifications/initialized`, and discover the tool set.
    pub async fn connect(
        transport: StreamTransport,
        client_info: ClientInfo,
        options: SessionOptions,
    ) -> Result<Self, McpError> {
        let shared = Arc::new(Shared::new(transport));
        let dispatcher = tokio::spawn(run_dispatcher(
            shared.clone(),
            options.malformed_frame_tolerance,
        ));

        let mut session = Self {
            shared,
            dispatcher,
            tools: HashMap::new(),
            call_timeout: options.call_timeout,
        };

        match session
            .handshake(client_info, options.handshake_timeout)
            .await
        {
            Ok(()) => Ok(session),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(
        &mut self,
        client_info: ClientInfo,
        timeout: Duration,
    ) -> Result<(), McpError> {
        self.shared.set_state(SessionState::Handshaking);

        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "roots": { "listChanged": true },
                "sampling": {},
            },
            "clientInfo": client_info,
        });
        let result = self
            .shared
            .request("initialize", Some(params), timeout)
            .await?;
        let init: InitializeResult =
            serde_json::from_value(result).map_err(|e| McpError::Handshake {
                reason: format!("failed to parse initialize response: {e}"),
            })?;
        if let Some(info) = &init.server_info {
            tracing::info!(
                server = info.name.as_deref().unwrap_or("<unknown>"),
                version = info.version.as_deref().unwrap_or("<unknown>"),
                protocol = init.protocol_version.as_deref().unwrap_or("<unknown>"),
                "mcp server initialized"
            );
        }

        // Fire-and-forget; the server expects no reply to this.
        self.notify("notifications/initialized", None).await?;

        let result = self
            .shared
            .request("tools/list", Some(serde_json::json!({})), timeout)
            .await?;
        let listing: ToolsListResult =
            serde_json::from_value(result).map_err(|e| McpError::Handshake {
                reason: format!("failed to parse tools/list response: {e}"),
            })?;
        tracing::info!(tools = listing.tools.len(), "tool set discovered");
        self.tools = listing
            .tools
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();

        self.shared.set_state(SessionState::Ready);
        Ok(())
    }

    /// Issue one request with the session's default timeout.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        self.call_with_timeout(method, params, self.call_timeout)
            .await
    }

    /// Issue one request with an explicit timeout.
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, McpError> {
        let state = self.shared.state();
        if state != SessionState::Ready {
            return Err(McpError::NotReady {
                state: state.as_str(),
            });
        }
        self.shared.request(method, params, timeout).await
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.shared
            .transport
            .send(&JsonRpcNotification::new(method, params))
            .await
    }

    /// Look up a discovered tool by name.
    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// All tools discovered during the handshake.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Number of discovered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Close the session: cancel outstanding calls, stop the dispatcher and
    /// kill the server process. Idempotent.
    pub async fn close(&mut self) {
        self.shared.close_cancelled("session closed");
        self.dispatcher.abort();
        self.shared.transport.shutdown().await;
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        self.shared.close_cancelled("session dropped");
        self.dispatcher.abort();
        // The child process, if any, is killed by the transport's
        // kill-on-drop flag once the Arc unwinds.
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
