//! Newline-delimited JSON framing over a child process's stdio.
//!
//! Handles the byte-level contract with the MCP server:
//! - Writing one JSON object per line to stdin, flushed immediately
//! - Reading one line at a time from stdout
//! - Owning the child process lifetime (killed on shutdown or drop)
//!
//! The transport is deliberately untyped: it moves lines, not frames. Frame
//! decoding and routing belong to the session's dispatcher.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::errors::McpError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// Bi-directional line-delimited transport.
///
/// Writes are serialized through a mutex so concurrent senders never
/// interleave partial frames. The read side is also guarded, but by contract
/// only the session dispatcher ever calls [`recv`](Self::recv).
pub struct StreamTransport {
    name: String,
    writer: Mutex<BoxedWriter>,
    reader: Mutex<BoxedReader>,
    child: Mutex<Option<Child>>,
}

impl StreamTransport {
    /// Spawn a server process and wire its stdio up as the transport.
    ///
    /// stderr is drained in a background task and forwarded to the log —
    /// it is diagnostic output, not part of the protocol.
    pub async fn spawn(mut command: Command, name: &str) -> Result<Self, McpError> {
        command
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| McpError::Spawn {
            reason: format!("{e}"),
        })?;

        let stdin = child.stdin.take().ok_or(McpError::Spawn {
            reason: "failed to capture stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or(McpError::Spawn {
            reason: "failed to capture stdout".into(),
        })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            writer: Mutex::new(Box::new(stdin) as BoxedWriter),
            reader: Mutex::new(BufReader::new(
                Box::new(stdout) as Box<dyn AsyncRead + Send + Unpin>
            )),
            child: Mutex::new(Some(child)),
        })
    }

    /// Wrap an arbitrary reader/writer pair with no owned process.
    ///
    /// Used by tests to drive a session over in-memory duplex streams.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            name: "in-process".to_string(),
            writer: Mutex::new(Box::new(writer) as BoxedWriter),
            reader: Mutex::new(BufReader::new(
                Box::new(reader) as Box<dyn AsyncRead + Send + Unpin>
            )),
            child: Mutex::new(None),
        }
    }

    /// Serialize one frame, append the line delimiter, write and flush.
    pub async fn send<T: Serialize>(&self, frame: &T) -> Result<(), McpError> {
        let mut json = serde_json::to_string(frame).map_err(|e| McpError::Protocol {
            reason: format!("failed to serialize frame: {e}"),
        })?;
        json.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::Transport {
                reason: format!("failed to write to '{}': {e}", self.name),
            })?;
        writer.flush().await.map_err(|e| McpError::Transport {
            reason: format!("failed to flush '{}': {e}", self.name),
        })?;
        Ok(())
    }

    /// Read one complete delimited frame as raw text.
    ///
    /// Returns `Ok(None)` on clean end-of-stream (the peer exited or closed
    /// stdout). Blank lines are skipped.
    pub async fn recv(&self) -> Result<Option<String>, McpError> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read =
                reader
                    .read_line(&mut line)
                    .await
                    .map_err(|e| McpError::Transport {
                        reason: format!("failed to read from '{}': {e}", self.name),
                    })?;
            if bytes_read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }

    /// Kill the owned process, if any. Idempotent.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(server = %self.name, error = %e, "kill on shutdown failed");
            }
        }
    }
}

/// Drain a child's stderr into the log, line by line.
async fn forward_stderr(stderr: tokio::process::ChildStderr, name: String) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(server = %name, "stderr: {line}");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
