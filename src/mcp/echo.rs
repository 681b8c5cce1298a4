//! Minimal MCP server used as a known-good handshake target.
//!
//! Exposes a single `ping` tool over JSON-RPC 2.0 on stdio.

use super::protocol::*;
use super::tools::echo_tools;
use crate::config::DEFAULT_PROTOCOL_VERSION;
use crate::error::Result;
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const SERVER_NAME: &str = "mcp-probe-echo";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line written before each response when emitting malformed output.
pub const MALFORMED_LINE: &str = "this line is not JSON-RPC";

/// Knobs that make the echo server misbehave in specific ways.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBehavior {
    /// Answer `tools/list` with a result that has no `tools` array.
    pub omit_tools: bool,
    /// Write a non-JSON line before every response.
    pub malformed_lines: bool,
    /// Answer every `tools/call` with a JSON-RPC error.
    pub fail_calls: bool,
    /// Answer every `tools/call` with a result flagged `isError`.
    pub tool_errors: bool,
}

/// MCP echo server.
pub struct EchoServer {
    behavior: EchoBehavior,
}

impl EchoServer {
    pub fn new(behavior: EchoBehavior) -> Self {
        Self { behavior }
    }

    /// Serve requests from `input` until end of input.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        debug!(behavior = ?self.behavior, "Echo server starting");

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(&request),
                Err(e) => {
                    warn!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(None, -32700, "Parse error"))
                }
            };

            if let Some(response) = response {
                if self.behavior.malformed_lines {
                    writeln!(output, "{}", MALFORMED_LINE)?;
                }
                writeln!(output, "{}", serde_json::to_string(&response)?)?;
                output.flush()?;
            }
        }

        debug!("Echo server input closed");
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications get no response.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": DEFAULT_PROTOCOL_VERSION,
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION}
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, &request.params),
            _ => JsonRpcResponse::error(
                id,
                -32601,
                &format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        if self.behavior.omit_tools {
            return JsonRpcResponse::success(id, json!({}));
        }
        JsonRpcResponse::success(id, json!({ "tools": echo_tools() }))
    }

    fn handle_tools_call(&self, id: Option<Value>, params: &Value) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params.clone()) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, -32602, &format!("Invalid params: {}", e)),
        };

        if params.name != "ping" {
            return JsonRpcResponse::error(id, -32602, &format!("Unknown tool: {}", params.name));
        }
        if self.behavior.fail_calls {
            return JsonRpcResponse::error(id, -32000, "ping is configured to fail");
        }

        let result = if self.behavior.tool_errors {
            ToolCallResult::error("ping refused the call".to_string())
        } else {
            ToolCallResult::text("pong".to_string())
        };

        match serde_json::to_value(result) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, -32603, &format!("Internal error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn serve(behavior: EchoBehavior, input: &str) -> Vec<String> {
        let mut output = Vec::new();
        EchoServer::new(behavior)
            .run(Cursor::new(input.to_string()), &mut output)
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn parse(line: &str) -> Value {
        serde_json::from_str(line).unwrap()
    }

    const HANDSHAKE: &str = concat!(
        r#"{"jsonrpc":"2.0","method":"initialize","params":{},"id":1}"#, "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized","params":{}}"#, "\n",
        r#"{"jsonrpc":"2.0","method":"tools/list","params":{},"id":2}"#, "\n",
        r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"ping","arguments":{}},"id":3}"#, "\n",
    );

    #[test]
    fn test_handshake_responses() {
        let lines = serve(EchoBehavior::default(), HANDSHAKE);
        assert_eq!(lines.len(), 3, "notification must not be answered");

        let init = parse(&lines[0]);
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["serverInfo"]["name"], SERVER_NAME);

        let list = parse(&lines[1]);
        assert_eq!(list["id"], 2);
        assert_eq!(list["result"]["tools"][0]["name"], "ping");

        let call = parse(&lines[2]);
        assert_eq!(call["id"], 3);
        assert_eq!(call["result"]["content"][0]["text"], "pong");
    }

    #[test]
    fn test_omit_tools() {
        let behavior = EchoBehavior {
            omit_tools: true,
            ..Default::default()
        };
        let lines = serve(behavior, HANDSHAKE);
        let list = parse(&lines[1]);
        assert!(list["result"].get("tools").is_none());
    }

    #[test]
    fn test_malformed_lines_precede_responses() {
        let behavior = EchoBehavior {
            malformed_lines: true,
            ..Default::default()
        };
        let lines = serve(behavior, HANDSHAKE);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], MALFORMED_LINE);
        assert!(serde_json::from_str::<Value>(&lines[0]).is_err());
        assert_eq!(parse(&lines[1])["id"], 1);
    }

    #[test]
    fn test_fail_calls() {
        let behavior = EchoBehavior {
            fail_calls: true,
            ..Default::default()
        };
        let lines = serve(behavior, HANDSHAKE);
        let call = parse(&lines[2]);
        assert_eq!(call["error"]["code"], -32000);
        assert!(call.get("result").is_none());
    }

    #[test]
    fn test_tool_errors_flag_result() {
        let behavior = EchoBehavior {
            tool_errors: true,
            ..Default::default()
        };
        let lines = serve(behavior, HANDSHAKE);
        let call = parse(&lines[2]);
        assert!(call.get("error").is_none());
        assert_eq!(call["result"]["isError"], true);
        assert_eq!(call["result"]["content"][0]["text"], "ping refused the call");
    }

    #[test]
    fn test_errors() {
        let lines = serve(
            EchoBehavior::default(),
            concat!(
                "garbage\n",
                r#"{"jsonrpc":"2.0","method":"resources/list","params":{},"id":5}"#, "\n",
                r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"nope"},"id":6}"#, "\n",
            ),
        );

        let parse_error = parse(&lines[0]);
        assert_eq!(parse_error["error"]["code"], -32700);
        assert!(parse_error["id"].is_null());

        assert_eq!(parse(&lines[1])["error"]["code"], -32601);
        assert_eq!(parse(&lines[2])["error"]["code"], -32602);
    }
}
