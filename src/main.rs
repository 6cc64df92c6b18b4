//! CLI entry point: spawn the server, open the session, run the pipeline.

use anyhow::Context;
use clap::Parser;

use patchpilot::config::AppConfig;
use patchpilot::llm::CompletionClient;
use patchpilot::mcp::{ClientInfo, McpSession, StreamTransport, ToolInvoker};
use patchpilot::review::{ReviewPipeline, ReviewRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::parse();
    run(config).await
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let transport = StreamTransport::spawn(config.server_command(), "github")
        .await
        .context("failed to launch the GitHub MCP server")?;

    let mut session = McpSession::connect(
        transport,
        ClientInfo::default(),
        config.session_options(),
    )
    .await
    .context("MCP session handshake failed")?;

    let completions = CompletionClient::new(
        &config.llm_base_url,
        &config.model,
        config.openai_api_key.clone(),
    )
    .context("failed to build the completion client")?;

    let pipeline = ReviewPipeline::new(
        ToolInvoker::new(&session),
        &completions,
        ReviewRequest {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            event: config.event.clone(),
        },
    );

    let outcome = pipeline.run().await;

    // Deterministic teardown on every exit path: cancel outstanding calls
    // and kill the server process before reporting the result.
    session.close().await;

    let posted = outcome.context("review pipeline aborted")?;
    tracing::info!(pr = posted.pr_number, "review posted successfully");
    println!(
        "Posted review on {}/{}#{} ({} chars)",
        config.owner,
        config.repo,
        posted.pr_number,
        posted.body.len()
    );
    Ok(())
}

/// Initialize the tracing subscriber: structured logs to stderr, level
/// controlled by `RUST_LOG` (default `info`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
