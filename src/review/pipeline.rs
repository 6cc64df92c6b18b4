//! The review pipeline: seven sequential stages from auth check to posted
//! review.
//!
//! Each stage consumes the previous stage's output; the first failure aborts
//! the run. The posting stage only ever executes after everything before it
//! succeeded, so a partial or empty review is never published.

use serde_json::json;

use crate::llm::{ChatMessage, Completions};
use crate::mcp::ToolInvoker;

use super::errors::PipelineError;
use super::payload::{
    extract_head_sha, parse_changed_files, parse_pull_requests, ChangedFile, PullRequestSummary,
    ReviewPayload,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Fixed reviewer role instruction for the completion request.
const REVIEWER_ROLE: &str = "You are a senior software engineer reviewing a pull request. \
    Point out bugs, risky changes, missing error handling, and style problems. \
    Be specific: reference filenames and the relevant hunks. \
    End with a short overall assessment.";

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Which repository to review, and how to post the result.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub owner: String,
    pub repo: String,
    /// Review event type passed to `pull_request_review_write` (e.g.
    /// `COMMENT`, `APPROVE`, `REQUEST_CHANGES`).
    pub event: String,
}

/// The posted review, for reporting.
#[derive(Debug)]
pub struct PostedReview {
    pub pr_number: u64,
    pub body: String,
}

/// Sequential review pipeline over a tool invoker and a completion backend.
pub struct ReviewPipeline<'a, C: Completions> {
    invoker: ToolInvoker<'a>,
    completions: &'a C,
    request: ReviewRequest,
}

impl<'a, C: Completions> ReviewPipeline<'a, C> {
    pub fn new(invoker: ToolInvoker<'a>, completions: &'a C, request: ReviewRequest) -> Self {
        Self {
            invoker,
            completions,
            request,
        }
    }

    /// Run all stages in order. Any failure aborts the remaining stages.
    pub async fn run(&self) -> Result<PostedReview, PipelineError> {
        self.identify().await?;
        let pr = self.locate_pr().await?;
        let head_sha = self.fetch_head_sha(pr.number).await?;
        let diff = self.fetch_diff(pr.number).await?;
        let files = self.fetch_changed_files(pr.number).await?;

        let mut payload = ReviewPayload::new(pr.number, diff);
        self.fetch_file_contents(&mut payload, &files, &head_sha)
            .await?;

        let body = self.generate_review(&payload).await?;
        self.post_review(pr.number, &body).await?;

        Ok(PostedReview {
            pr_number: pr.number,
            body,
        })
    }

    /// Stage 1: `get_me`. The result is unused; a failure here means the
    /// token is bad and nothing further is worth attempting.
    async fn identify(&self) -> Result<(), PipelineError> {
        self.invoker
            .invoke("get_me", json!({}))
            .await
            .map_err(PipelineError::tool("identify"))?;
        tracing::info!(stage = "identify", "authenticated against the server");
        Ok(())
    }

    /// Stage 2: list pull requests and pick the first as the PR under review.
    async fn locate_pr(&self) -> Result<PullRequestSummary, PipelineError> {
        const STAGE: &str = "locate-pr";
        let result = self
            .invoker
            .invoke(
                "list_pull_requests",
                json!({"owner": self.request.owner, "repo": self.request.repo}),
            )
            .await
            .map_err(PipelineError::tool(STAGE))?;
        let text = result.first_text().ok_or_else(|| PipelineError::Malformed {
            stage: STAGE,
            reason: "listing carried no text content item".into(),
        })?;
        let mut list = parse_pull_requests(text).map_err(|e| PipelineError::Malformed {
            stage: STAGE,
            reason: format!("unparseable pull request listing: {e}"),
        })?;
        if list.is_empty() {
            return Err(PipelineError::NoOpenPullRequests {
                owner: self.request.owner.clone(),
                repo: self.request.repo.clone(),
            });
        }
        // The listing's first element is taken as the most recent PR; the
        // server's default sort is newest-first.
        let pr = list.remove(0);
        tracing::info!(stage = STAGE, pr = pr.number, title = %pr.title, "selected pull request");
        Ok(pr)
    }

    /// Stage 3: fetch PR detail and extract the head commit sha.
    async fn fetch_head_sha(&self, pr_number: u64) -> Result<String, PipelineError> {
        const STAGE: &str = "pr-detail";
        let result = self
            .invoker
            .invoke("pull_request_read", self.read_args("get", pr_number))
            .await
            .map_err(PipelineError::tool(STAGE))?;
        let text = result.first_text().ok_or_else(|| PipelineError::Malformed {
            stage: STAGE,
            reason: "detail carried no text content item".into(),
        })?;
        let head_sha = extract_head_sha(text).ok_or_else(|| PipelineError::Malformed {
            stage: STAGE,
            reason: "detail is missing head.sha".into(),
        })?;
        tracing::info!(stage = STAGE, head = %head_sha, "resolved head commit");
        Ok(head_sha)
    }

    /// Stage 4a: fetch the PR diff text.
    async fn fetch_diff(&self, pr_number: u64) -> Result<String, PipelineError> {
        const STAGE: &str = "diff-and-files";
        let result = self
            .invoker
            .invoke("pull_request_read", self.read_args("get_diff", pr_number))
            .await
            .map_err(PipelineError::tool(STAGE))?;
        let diff = result.first_text().ok_or_else(|| PipelineError::Malformed {
            stage: STAGE,
            reason: "diff carried no text content item".into(),
        })?;
        Ok(diff.to_string())
    }

    /// Stage 4b: fetch the changed-file listing.
    async fn fetch_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>, PipelineError> {
        const STAGE: &str = "diff-and-files";
        let result = self
            .invoker
            .invoke("pull_request_read", self.read_args("get_files", pr_number))
            .await
            .map_err(PipelineError::tool(STAGE))?;
        let text = result.first_text().ok_or_else(|| PipelineError::Malformed {
            stage: STAGE,
            reason: "file listing carried no text content item".into(),
        })?;
        let files = parse_changed_files(text).map_err(|e| PipelineError::Malformed {
            stage: STAGE,
            reason: format!("unparseable file listing: {e}"),
        })?;
        tracing::info!(stage = STAGE, files = files.len(), "fetched changed files");
        Ok(files)
    }

    /// Stage 5: fetch each surviving file's content at the head commit, in
    /// listing order. Removed files have nothing to fetch and are skipped.
    async fn fetch_file_contents(
        &self,
        payload: &mut ReviewPayload,
        files: &[ChangedFile],
        head_sha: &str,
    ) -> Result<(), PipelineError> {
        const STAGE: &str = "file-contents";
        for file in files {
            if file.is_removed() {
                tracing::info!(stage = STAGE, file = %file.filename, "skipping removed file");
                continue;
            }
            let result = self
                .invoker
                .invoke(
                    "get_file_contents",
                    json!({
                        "owner": self.request.owner,
                        "repo": self.request.repo,
                        "path": file.filename,
                        "ref": head_sha,
                    }),
                )
                .await
                .map_err(PipelineError::tool(STAGE))?;
            // File bodies arrive as a resource item; fall back to inline
            // text for servers that return plain text instead.
            let content = result
                .text_or_resource()
                .ok_or_else(|| PipelineError::Malformed {
                    stage: STAGE,
                    reason: format!("no content for '{}'", file.filename),
                })?;
            payload.push_file(
                file.filename.clone(),
                file.status.clone(),
                content.to_string(),
            );
        }
        Ok(())
    }

    /// Stage 6: ask the model for the review text.
    async fn generate_review(&self, payload: &ReviewPayload) -> Result<String, PipelineError> {
        const STAGE: &str = "generate-review";
        let messages = vec![
            ChatMessage::system(REVIEWER_ROLE),
            ChatMessage::user(payload.render_prompt()),
        ];
        let body = self
            .completions
            .complete(messages)
            .await
            .map_err(|source| PipelineError::Completion { source })?;
        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(PipelineError::EmptyReview);
        }
        tracing::info!(stage = STAGE, chars = body.len(), "generated review");
        Ok(body)
    }

    /// Stage 7: post the review. Only reachable when stages 1–6 succeeded.
    async fn post_review(&self, pr_number: u64, body: &str) -> Result<(), PipelineError> {
        const STAGE: &str = "post-review";
        self.invoker
            .invoke(
                "pull_request_review_write",
                json!({
                    "method": "create",
                    "event": self.request.event,
                    "owner": self.request.owner,
                    "repo": self.request.repo,
                    "pullNumber": pr_number,
                    "body": body,
                }),
            )
            .await
            .map_err(PipelineError::tool(STAGE))?;
        tracing::info!(stage = STAGE, pr = pr_number, "review posted");
        Ok(())
    }

    fn read_args(&self, method: &str, pr_number: u64) -> serde_json::Value {
        json!({
            "method": method,
            "owner": self.request.owner,
            "repo": self.request.repo,
            "pullNumber": pr_number,
        })
    }
}
