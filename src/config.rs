//! Runtime configuration.
//!
//! CLI flags plus environment variables. Credentials are only ever read from
//! the environment and never echoed back in help output or logs.

use std::time::Duration;

use clap::Parser;
use tokio::process::Command;

use crate::mcp::SessionOptions;

/// Default image of the GitHub MCP server.
const DEFAULT_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server:latest";

/// Review a repository's latest pull request through the GitHub MCP server.
#[derive(Debug, Parser)]
#[command(name = "patchpilot", version, about)]
pub struct AppConfig {
    /// Repository owner (user or organization).
    #[arg(long)]
    pub owner: String,

    /// Repository name.
    #[arg(long)]
    pub repo: String,

    /// Review event type: COMMENT, APPROVE, or REQUEST_CHANGES.
    #[arg(long, default_value = "COMMENT")]
    pub event: String,

    /// Container image of the GitHub MCP server.
    #[arg(long, default_value = DEFAULT_MCP_IMAGE)]
    pub mcp_image: String,

    /// GitHub access token handed to the MCP server.
    #[arg(long, env = "GITHUB_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// GitHub Enterprise host override, forwarded to the server.
    #[arg(long, env = "GITHUB_HOST")]
    pub github_host: Option<String>,

    /// Base URL of the OpenAI-compatible completion endpoint.
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    /// Model used to generate the review.
    #[arg(long, default_value = "gpt-4o-mini")]
    pub model: String,

    /// API key for the completion endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Per-tool-call response timeout in seconds.
    #[arg(long, default_value_t = 120)]
    pub call_timeout_secs: u64,

    /// Handshake (initialize / tools-list) timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub init_timeout_secs: u64,
}

impl AppConfig {
    /// The `docker run` invocation that launches the MCP server with its
    /// credential environment.
    pub fn server_command(&self) -> Command {
        let mut cmd = Command::new("docker");
        cmd.arg("run").arg("-i").arg("--rm");
        cmd.arg("-e").arg(format!(
            "GITHUB_PERSONAL_ACCESS_TOKEN={}",
            self.github_token
        ));
        if let Some(host) = &self.github_host {
            cmd.arg("-e").arg(format!("GITHUB_HOST={host}"));
        }
        cmd.arg(&self.mcp_image);
        cmd
    }

    /// Session tunables derived from the CLI flags.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            handshake_timeout: Duration::from_secs(self.init_timeout_secs),
            ..SessionOptions::default()
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
