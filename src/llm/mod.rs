//! Completion client — OpenAI-compatible API client for review generation.
//!
//! This module handles the single external LLM boundary of the pipeline:
//! - Non-streaming chat completions over HTTP
//! - Bearer authentication when an API key is configured
//!
//! The client speaks the OpenAI Chat Completions API, making the model
//! interchangeable via config. Pointing at a local runtime is a flag
//! change, not a code change.

pub mod client;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::{CompletionClient, Completions};
pub use errors::CompletionError;
pub use types::{ChatMessage, Role};
