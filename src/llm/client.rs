//! OpenAI-compatible completion client.
//!
//! One request, one response: the review pipeline needs a single completion
//! per run, so there is no streaming and no fallback chain here.

use std::future::Future;
use std::time::Duration;

use reqwest::Client as HttpClient;

use super::errors::CompletionError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout. Reviews of large diffs can take a while to
/// generate, so this is deliberately generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Sampling temperature. Reviews should be deterministic-ish, not creative.
const TEMPERATURE: f32 = 0.2;

// ─── Completions Seam ────────────────────────────────────────────────────────

/// The completion boundary the pipeline depends on.
///
/// The production implementation is [`CompletionClient`]; tests substitute a
/// canned backend.
pub trait Completions {
    fn complete(
        &self,
        messages: Vec<ChatMessage>,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

// ─── CompletionClient ────────────────────────────────────────────────────────

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct CompletionClient {
    http: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl CompletionClient {
    /// Build a client for the given endpoint and model.
    ///
    /// Does NOT check connectivity — that happens on the first request.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> Result<Self, CompletionError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CompletionError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

impl Completions for CompletionClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: None,
            stream: false,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CompletionError::ConnectionFailed {
                endpoint: url.clone(),
                reason: format!("{e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::InvalidResponse {
                    reason: format!("{e}"),
                })?;

        extract_content(parsed)
    }
}

/// Pull the first choice's content out of a completion response.
fn extract_content(response: ChatCompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::types::{Choice, ResponseMessage};
    use super::*;

    fn response_with(content: Option<&str>) -> ChatCompletionResponse {
        ChatCompletionResponse {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: content.map(str::to_string),
                },
            }],
        }
    }

    #[test]
    fn test_extract_content_success() {
        let text = extract_content(response_with(Some("A solid change."))).unwrap();
        assert_eq!(text, "A solid change.");
    }

    #[test]
    fn test_extract_content_no_choices() {
        let err = extract_content(ChatCompletionResponse { choices: vec![] }).unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[test]
    fn test_extract_content_blank_is_empty() {
        let err = extract_content(response_with(Some("   \n"))).unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = CompletionClient::new("https://api.openai.com/v1/", "gpt-4o-mini", None)
            .unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
