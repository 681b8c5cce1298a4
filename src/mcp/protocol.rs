//! MCP protocol types (JSON-RPC 2.0).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const JSONRPC_VERSION: &str = "2.0";

/// Wire method of the post-initialize notification.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

/// Outgoing JSON-RPC message. Without an `id` it is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// A request that expects a response correlated by `id`.
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id: Some(Value::from(id)),
        }
    }

    /// A fire-and-forget notification.
    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id: None,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i64, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            }),
            id,
        }
    }

    /// The numeric id, if this response carries one.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Any line read from the server, before it is classified.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl IncomingMessage {
    /// Convert into a response, unless the server sent a request or notification.
    pub fn into_response(self) -> Option<JsonRpcResponse> {
        if self.method.is_some() {
            return None;
        }
        Some(JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: self.result,
            error: self.error,
            id: self.id,
        })
    }
}

/// MCP Initialize request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    pub roots: RootsCapability,
    pub sampling: Map<String, Value>,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            roots: RootsCapability { list_changed: true },
            sampling: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// A tool as advertised by a server in `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<InputSchema>,
}

impl ToolDescriptor {
    /// Parameter names from the input schema, in sorted order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.input_schema
            .as_ref()
            .map(|schema| schema.properties.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Object schema of a tool's arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// One parameter of a tool's input schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// A type name, or a list of them.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Tool call request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Tool call response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text: message }],
            is_error: Some(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = JsonRpcRequest::new(3, "tools/list", json!({}));
        let line = serde_json::to_string(&request).unwrap();
        assert_eq!(
            line,
            r#"{"jsonrpc":"2.0","method":"tools/list","params":{},"id":3}"#
        );
    }

    #[test]
    fn test_notification_has_no_id() {
        let notification = JsonRpcRequest::notification(INITIALIZED_NOTIFICATION, json!({}));
        assert!(notification.is_notification());
        let value = serde_json::to_value(&notification).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_initialize_params_shape() {
        let params = InitializeParams {
            protocol_version: "2024-11-05".into(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: "mcp-probe".into(),
                version: "0.1.0".into(),
            },
        };
        let value = serde_json::to_value(params).unwrap();
        assert_eq!(value["protocolVersion"], "2024-11-05");
        assert_eq!(value["capabilities"]["roots"]["listChanged"], true);
        assert_eq!(value["capabilities"]["sampling"], json!({}));
        assert_eq!(value["clientInfo"]["name"], "mcp-probe");
    }

    #[test]
    fn test_incoming_server_request_is_not_a_response() {
        let message: IncomingMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"roots/list"}"#).unwrap();
        assert!(message.into_response().is_none());

        let message: IncomingMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":{}}"#).unwrap();
        let response = message.into_response().unwrap();
        assert_eq!(response.numeric_id(), Some(7));
    }

    #[test]
    fn test_tool_descriptor_parameters() {
        let tool: ToolDescriptor = serde_json::from_value(json!({
            "name": "read_file",
            "description": "Read a file",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path"},
                    "encoding": {"type": ["string", "null"]}
                },
                "required": ["path"]
            }
        }))
        .unwrap();

        assert_eq!(tool.parameter_names(), vec!["encoding", "path"]);
        let schema = tool.input_schema.unwrap();
        assert_eq!(schema.required, vec!["path".to_string()]);
        assert_eq!(
            schema.properties["path"].description.as_deref(),
            Some("File path")
        );
    }

    #[test]
    fn test_tool_descriptor_without_schema() {
        let tool: ToolDescriptor = serde_json::from_value(json!({"name": "ping"})).unwrap();
        assert!(tool.description.is_none());
        assert!(tool.parameter_names().is_empty());
    }
}
