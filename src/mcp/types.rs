//! Shared types for the MCP client.
//!
//! JSON-RPC 2.0 message types and MCP protocol structures.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Protocol Constants ──────────────────────────────────────────────────────

/// The MCP protocol revision this client speaks.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC version string carried on every frame.
pub const JSONRPC_VERSION: &str = "2.0";

// ─── Request Identifiers ─────────────────────────────────────────────────────

/// A JSON-RPC request identifier.
///
/// The protocol allows both integer and string ids. This client always
/// allocates numeric ids, but responses are matched by value so a server
/// echoing string ids still correlates correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Num(u64),
    Str(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Num(n) => write!(f, "{n}"),
            RequestId::Str(s) => write!(f, "{s}"),
        }
    }
}

// ─── JSON-RPC 2.0 Frames ─────────────────────────────────────────────────────

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: RequestId, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification message (a request without an id).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC notification.
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        }
    }
}

/// Any frame read off the wire: response, notification, or server-initiated
/// request. The dispatcher classifies it by which fields are present.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingFrame {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl IncomingFrame {
    /// Whether this frame is a notification (method present, no id).
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

// ─── MCP Protocol Types ──────────────────────────────────────────────────────

/// Client identity sent in the `initialize` request.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Payload of a successful `initialize` response.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(default, alias = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default, alias = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

/// Server identity returned in the initialize response.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// One tool as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "inputSchema")]
    pub input_schema: Value,
}

/// Payload of a successful `tools/list` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

// ─── Tool Call Results ───────────────────────────────────────────────────────

/// One element of a tool call's `content` array.
///
/// Anything that is not inline text or a resource carrying text is a
/// contract violation and fails decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
    Resource { resource: ResourceContents },
}

/// The body of a resource content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContents {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(
        default,
        alias = "mimeType",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
}

/// Decoded result of a `tools/call`, preserving content item order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub items: Vec<ContentItem>,
}

impl ToolCallResult {
    /// The first inline text item, if any.
    ///
    /// Items are located by kind, never by position — servers are free to
    /// reorder or interleave text and resource items.
    pub fn first_text(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            ContentItem::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// The first resource item's text body, if any.
    pub fn first_resource_text(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            ContentItem::Resource { resource } => Some(resource.text.as_str()),
            _ => None,
        })
    }

    /// Prefer a resource body, fall back to inline text.
    ///
    /// `get_file_contents` returns file bodies as a resource item alongside a
    /// text item of metadata; other tools return a single text item.
    pub fn text_or_resource(&self) -> Option<&str> {
        self.first_resource_text().or_else(|| self.first_text())
    }

    /// Number of content items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the result carried no content items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = JsonRpcRequest::new(RequestId::Num(1), "initialize", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
        // params should be omitted when None
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = JsonRpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(json.contains("notifications/initialized"));
    }

    #[test]
    fn test_request_id_roundtrip_numeric_and_string() {
        let num: RequestId = serde_json::from_str("7").unwrap();
        assert_eq!(num, RequestId::Num(7));
        let text: RequestId = serde_json::from_str("\"getmeRequest\"").unwrap();
        assert_eq!(text, RequestId::Str("getmeRequest".into()));
        assert_eq!(serde_json::to_string(&num).unwrap(), "7");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"getmeRequest\"");
    }

    #[test]
    fn test_incoming_frame_classification() {
        let resp: IncomingFrame =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).unwrap();
        assert_eq!(resp.id, Some(RequestId::Num(3)));
        assert!(!resp.is_notification());

        let note: IncomingFrame =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#)
                .unwrap();
        assert!(note.is_notification());
    }

    #[test]
    fn test_error_frame_deserialization() {
        let frame: IncomingFrame = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let err = frame.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
    }

    #[test]
    fn test_content_item_tagged_decoding() {
        let items: Vec<ContentItem> = serde_json::from_str(
            r#"[
                {"type":"text","text":"hello"},
                {"type":"resource","resource":{"text":"body","uri":"repo://a.py","mimeType":"text/x-python"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            ContentItem::Text {
                text: "hello".into()
            }
        );
        match &items[1] {
            ContentItem::Resource { resource } => {
                assert_eq!(resource.text, "body");
                assert_eq!(resource.mime_type.as_deref(), Some("text/x-python"));
            }
            other => panic!("expected resource, got {other:?}"),
        }
    }

    #[test]
    fn test_content_item_unknown_kind_is_rejected() {
        let result: Result<Vec<ContentItem>, _> =
            serde_json::from_str(r#"[{"type":"image","data":"..."}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_call_result_accessors_ignore_order() {
        // Resource first, text second: accessors locate items by kind.
        let result = ToolCallResult {
            items: vec![
                ContentItem::Resource {
                    resource: ResourceContents {
                        text: "file body".into(),
                        uri: None,
                        mime_type: None,
                    },
                },
                ContentItem::Text {
                    text: "metadata".into(),
                },
            ],
        };
        assert_eq!(result.first_text(), Some("metadata"));
        assert_eq!(result.first_resource_text(), Some("file body"));
        assert_eq!(result.text_or_resource(), Some("file body"));
    }

    #[test]
    fn test_tool_descriptor_input_schema_alias() {
        let tool: ToolDescriptor = serde_json::from_str(
            r#"{"name":"get_me","description":"Get the authenticated user","inputSchema":{"type":"object"}}"#,
        )
        .unwrap();
        assert_eq!(tool.name, "get_me");
        assert_eq!(tool.input_schema["type"], "object");
    }
}
