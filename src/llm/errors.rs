//! Completion client error types.

use thiserror::Error;

/// Errors that can occur during completion requests.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// TCP/HTTP connection to the endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// Non-2xx HTTP response from the endpoint.
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        body: String,
    },

    /// The response body could not be parsed.
    #[error("invalid completion response: {reason}")]
    InvalidResponse {
        reason: String,
    },

    /// The endpoint answered but produced no usable content.
    #[error("model returned an empty completion")]
    EmptyResponse,

    /// Client construction or configuration error.
    #[error("completion config error: {reason}")]
    Config {
        reason: String,
    },
}
