//! MCP client error types.

use thiserror::Error;

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server process failed to start.
    #[error("failed to spawn MCP server: {reason}")]
    Spawn {
        reason: String,
    },

    /// I/O failure on the underlying stream (write failed, pipe broken).
    #[error("transport error: {reason}")]
    Transport {
        reason: String,
    },

    /// The stream or session is closed; outstanding calls are cancelled
    /// with this error.
    #[error("session closed: {reason}")]
    Closed {
        reason: String,
    },

    /// A frame or response violated the protocol contract (malformed JSON,
    /// missing fields, content items of an unknown kind). Fatal for the
    /// offending call only.
    #[error("protocol violation: {reason}")]
    Protocol {
        reason: String,
    },

    /// No response arrived within the caller's budget.
    #[error("request '{method}' timed out after {timeout_ms}ms")]
    Timeout {
        method: String,
        timeout_ms: u64,
    },

    /// The server answered with a JSON-RPC error object.
    #[error("server error [{code}]: {message}")]
    Server {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The tool itself reported failure (`isError` set on the result).
    #[error("tool '{name}' failed: {message}")]
    ToolFailed {
        name: String,
        message: String,
    },

    /// Tool name not present in the session's discovered tool set.
    #[error("unknown tool: '{name}'")]
    UnknownTool {
        name: String,
    },

    /// The initialization handshake did not complete.
    #[error("handshake failed: {reason}")]
    Handshake {
        reason: String,
    },

    /// A call was issued while the session was not in the `Ready` state.
    #[error("session is not ready (state: {state})")]
    NotReady {
        state: &'static str,
    },
}
