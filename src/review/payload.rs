//! Review payload assembly and tool-result parsing.
//!
//! The GitHub MCP tools return their structured data as JSON *text* inside
//! content items, so every stage re-parses a string payload. The pure
//! parsers live here, away from the wire plumbing, along with the payload
//! the orchestrator accumulates across stages.

use serde::Deserialize;
use serde_json::Value;

/// Change status that excludes a file from content fetching.
pub const REMOVED_STATUS: &str = "removed";

// ─── Parsed Tool Payloads ────────────────────────────────────────────────────

/// One pull request as returned by `list_pull_requests`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

/// One entry of `pull_request_read {method: "get_files"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
}

impl ChangedFile {
    /// Removed files have no content at the head commit and are never fetched.
    pub fn is_removed(&self) -> bool {
        self.status == REMOVED_STATUS
    }
}

/// Parse the JSON text payload of `list_pull_requests`.
///
/// The listing's order is taken as-is; the caller treats the first element
/// as the PR under review.
pub fn parse_pull_requests(text: &str) -> Result<Vec<PullRequestSummary>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Parse the JSON text payload of `pull_request_read {get_files}`.
pub fn parse_changed_files(text: &str) -> Result<Vec<ChangedFile>, serde_json::Error> {
    serde_json::from_str(text)
}

/// Extract the head commit sha from a `pull_request_read {get}` payload.
pub fn extract_head_sha(text: &str) -> Option<String> {
    let detail: Value = serde_json::from_str(text).ok()?;
    detail["head"]["sha"].as_str().map(str::to_string)
}

// ─── ReviewPayload ───────────────────────────────────────────────────────────

/// One reviewed file: name, change status, and content at the head commit.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub filename: String,
    pub status: String,
    pub content: String,
}

/// Everything handed to the model: the PR diff plus per-file records,
/// assembled incrementally across the pipeline stages.
#[derive(Debug)]
pub struct ReviewPayload {
    pub pr_number: u64,
    pub diff: String,
    pub files: Vec<FileRecord>,
}

impl ReviewPayload {
    pub fn new(pr_number: u64, diff: String) -> Self {
        Self {
            pr_number,
            diff,
            files: Vec::new(),
        }
    }

    /// Append a fetched file, preserving listing order.
    pub fn push_file(&mut self, filename: String, status: String, content: String) {
        self.files.push(FileRecord {
            filename,
            status,
            content,
        });
    }

    /// Render the user-message body for the completion request.
    pub fn render_prompt(&self) -> String {
        let mut prompt = format!(
            "Review pull request #{}.\n\n## Diff\n\n{}\n",
            self.pr_number, self.diff
        );
        if !self.files.is_empty() {
            prompt.push_str("\n## Changed files at the head commit\n");
            for file in &self.files {
                prompt.push_str(&format!(
                    "\n### {} ({})\n\n{}\n",
                    file.filename, file.status, file.content
                ));
            }
        }
        prompt
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
