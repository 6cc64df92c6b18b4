//! Typed `tools/call` layer over a session.
//!
//! Turns "method + loose JSON" into "tool name + decoded content items" and
//! enforces the result envelope contract: a `content` array of text and
//! resource items. Anything else is a protocol violation and is surfaced,
//! never swallowed.

use serde_json::Value;

use super::errors::McpError;
use super::session::McpSession;
use super::types::{ContentItem, ToolCallResult};

/// Issues tool calls against a session's discovered tool set.
pub struct ToolInvoker<'a> {
    session: &'a McpSession,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(session: &'a McpSession) -> Self {
        Self { session }
    }

    /// Invoke a tool by name and decode its content items.
    ///
    /// Arguments are forwarded unchecked against the tool's declared input
    /// schema; structural validation is the server's job and the caller's
    /// responsibility. The tool name, however, must exist in the session's
    /// descriptor set — a miss fails before any wire traffic.
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        if self.session.tool(tool_name).is_none() {
            return Err(McpError::UnknownTool {
                name: tool_name.to_string(),
            });
        }

        tracing::debug!(tool = tool_name, "invoking tool");
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });
        let result = self.session.call("tools/call", Some(params)).await?;
        decode_tool_result(tool_name, result)
    }
}

/// Decode a `tools/call` result value into ordered content items.
pub fn decode_tool_result(tool_name: &str, result: Value) -> Result<ToolCallResult, McpError> {
    // Tool-level failures come back as a normal result with `isError` set
    // and the message in a text item.
    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let message = result["content"][0]["text"]
            .as_str()
            .unwrap_or("tool reported failure without a message")
            .to_string();
        return Err(McpError::ToolFailed {
            name: tool_name.to_string(),
            message,
        });
    }

    let content = result
        .get("content")
        .cloned()
        .ok_or_else(|| McpError::Protocol {
            reason: format!("tools/call result for '{tool_name}' is missing the content array"),
        })?;

    let items: Vec<ContentItem> =
        serde_json::from_value(content).map_err(|e| McpError::Protocol {
            reason: format!("undecodable content item in '{tool_name}' result: {e}"),
        })?;

    Ok(ToolCallResult { items })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::session::{McpSession, SessionOptions};
    use super::super::testkit::{serve_handshake, session_pair, spawn_scripted_server};
    use super::super::types::ClientInfo;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_preserves_text_and_resource_order() {
        let result = decode_tool_result(
            "get_file_contents",
            json!({
                "content": [
                    {"type": "text", "text": "metadata"},
                    {"type": "resource", "resource": {"text": "print('hi')", "uri": "repo://a.py"}}
                ]
            }),
        )
        .unwrap();
        assert_eq!(result.len(), 2);
        assert!(matches!(result.items[0], ContentItem::Text { .. }));
        assert!(matches!(result.items[1], ContentItem::Resource { .. }));
        assert_eq!(result.first_text(), Some("metadata"));
        assert_eq!(result.first_resource_text(), Some("print('hi')"));
    }

    #[test]
    fn test_decode_missing_content_is_protocol_error() {
        let err = decode_tool_result("get_me", json!({"something": "else"})).unwrap_err();
        assert!(matches!(err, McpError::Protocol { .. }), "got {err:?}");
    }

    #[test]
    fn test_decode_unknown_item_kind_is_protocol_error() {
        let err = decode_tool_result(
            "get_me",
            json!({"content": [{"type": "audio", "data": "…"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, McpError::Protocol { .. }), "got {err:?}");
    }

    #[test]
    fn test_decode_is_error_flag_becomes_tool_failure() {
        let err = decode_tool_result(
            "list_pull_requests",
            json!({
                "isError": true,
                "content": [{"type": "text", "text": "repository not found"}]
            }),
        )
        .unwrap_err();
        match err {
            McpError::ToolFailed { name, message } => {
                assert_eq!(name, "list_pull_requests");
                assert_eq!(message, "repository not found");
            }
            other => panic!("expected tool failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_fails_without_wire_traffic() {
        // A server advertising zero tools: any invoke must fail with
        // UnknownTool, not a protocol error, and send nothing.
        let (transport, peer) = session_pair();
        spawn_scripted_server(peer, |mut peer| async move {
            serve_handshake(&mut peer, json!([])).await;
            // Anything arriving past the handshake fails the test.
            let req = peer.read_request().await;
            panic!("unexpected request after handshake: {}", req.method);
        });

        let session =
            McpSession::connect(transport, ClientInfo::default(), SessionOptions::default())
                .await
                .unwrap();
        let invoker = ToolInvoker::new(&session);
        let err = invoker.invoke("get_me", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::UnknownTool { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invoke_decodes_content_items() {
        let (transport, peer) = session_pair();
        spawn_scripted_server(peer, |mut peer| async move {
            serve_handshake(&mut peer, json!([{"name": "get_me"}])).await;
            let call = peer.read_request().await;
            assert_eq!(call.method, "tools/call");
            assert_eq!(call.params["name"], "get_me");
            peer.respond(
                &call.id,
                json!({"content": [{"type": "text", "text": "{\"login\":\"octocat\"}"}]}),
            )
            .await;
        });

        let session =
            McpSession::connect(transport, ClientInfo::default(), SessionOptions::default())
                .await
                .unwrap();
        let invoker = ToolInvoker::new(&session);
        let result = invoker.invoke("get_me", json!({})).await.unwrap();
        assert_eq!(result.first_text(), Some("{\"login\":\"octocat\"}"));
    }
}
