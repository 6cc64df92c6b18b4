//! Review pipeline error types.

use thiserror::Error;

use crate::llm::CompletionError;
use crate::mcp::McpError;

/// Errors that abort a review run.
///
/// Every variant names the stage it came from so the run terminates with a
/// stage-labeled message. Any failure before the final stage means no review
/// is posted at all.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A tool invocation failed in the named stage.
    #[error("stage '{stage}' failed: {source}")]
    Tool {
        stage: &'static str,
        #[source]
        source: McpError,
    },

    /// A stage's tool result did not carry the expected data.
    #[error("stage '{stage}' returned malformed data: {reason}")]
    Malformed {
        stage: &'static str,
        reason: String,
    },

    /// The repository has no open pull requests to review.
    #[error("no open pull requests in {owner}/{repo}")]
    NoOpenPullRequests {
        owner: String,
        repo: String,
    },

    /// The completion call failed.
    #[error("stage 'generate-review' failed: {source}")]
    Completion {
        #[source]
        source: CompletionError,
    },

    /// The model produced no review text.
    #[error("model returned an empty review")]
    EmptyReview,
}

impl PipelineError {
    /// Helper for mapping a tool error into a stage-labeled failure.
    pub(crate) fn tool(stage: &'static str) -> impl FnOnce(McpError) -> Self {
        move |source| Self::Tool { stage, source }
    }
}
