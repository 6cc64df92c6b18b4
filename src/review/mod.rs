//! Review orchestration — the PR walk from listing to posted review.
//!
//! This module handles:
//! - Parsing the JSON text payloads the GitHub MCP tools return
//! - Assembling the review payload (diff + per-file contents)
//! - Running the seven pipeline stages strictly in order
//!
//! The pipeline never posts a partial review: the write stage runs only
//! after every earlier stage has succeeded.

pub mod errors;
pub mod payload;
pub mod pipeline;

// Re-exports for convenience
pub use errors::PipelineError;
pub use payload::{ChangedFile, FileRecord, PullRequestSummary, ReviewPayload};
pub use pipeline::{PostedReview, ReviewPipeline, ReviewRequest};
