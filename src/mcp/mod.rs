//! MCP client — JSON-RPC 2.0 over a spawned server's stdio.
//!
//! This module handles:
//! - Spawning the MCP server process and framing messages over its stdio
//! - A single dispatcher loop correlating responses to pending requests
//! - The initialize / initialized / tools-list handshake
//! - Typed tool invocation with content-item decoding
//!
//! Layering is strict: the transport moves lines, the session moves frames,
//! the invoker moves tool results. Only the session's dispatcher reads.

pub mod errors;
pub mod invoker;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testkit;

// Re-exports for convenience
pub use errors::McpError;
pub use invoker::ToolInvoker;
pub use session::{McpSession, SessionOptions};
pub use transport::StreamTransport;
pub use types::{ClientInfo, ContentItem, ToolCallResult, ToolDescriptor};
