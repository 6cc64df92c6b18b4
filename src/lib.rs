//! patchpilot — automated pull-request review through the GitHub MCP server.
//!
//! The crate spawns the GitHub MCP server as a child process, speaks
//! newline-delimited JSON-RPC 2.0 over its stdio, walks the repository's
//! latest pull request, asks an OpenAI-compatible model for a review, and
//! posts the review back through the same tool surface.

pub mod config;
pub mod llm;
pub mod mcp;
pub mod review;

pub use config::AppConfig;
