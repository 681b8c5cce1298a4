//! Handshake session: one MCP server process driven through the seven steps.

use super::protocol::{
    ClientCapabilities, ClientInfo, InitializeParams, JsonRpcRequest, JsonRpcResponse,
    ToolCallParams, ToolDescriptor, INITIALIZED_NOTIFICATION,
};
use super::steps::Step;
use super::tools::ToolCache;
use super::transport::{ServerCommand, StdioTransport};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ProbeError, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const FIRST_REQUEST_ID: u64 = 1;

/// What one attempt against a server achieved.
#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub command: String,
    pub final_step: Step,
    pub tools: Vec<ToolDescriptor>,
    pub called_tool: Option<String>,
    pub tool_result: Option<Value>,
    pub tool_error: Option<String>,
    /// Server output lines that were not valid JSON-RPC.
    pub parse_errors: usize,
    /// Ids of every request sent, in order.
    pub request_ids: Vec<u64>,
    /// The error that ended the attempt early, if any.
    pub failure: Option<ProbeError>,
}

impl SessionOutcome {
    pub fn reached_close(&self) -> bool {
        self.final_step == Step::Closing
    }
}

/// State of one handshake against one server process.
pub struct Session {
    id: Uuid,
    settings: Settings,
    transport: Option<StdioTransport>,
    command: Option<ServerCommand>,
    step: Step,
    next_request_id: u64,
    request_ids: Vec<u64>,
    tools: ToolCache,
    called_tool: Option<String>,
    tool_result: Option<Value>,
    tool_error: Option<String>,
    parse_errors: usize,
    continuing: bool,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            transport: None,
            command: None,
            step: Step::Initializing,
            next_request_id: FIRST_REQUEST_ID,
            request_ids: Vec::new(),
            tools: ToolCache::new(),
            called_tool: None,
            tool_result: None,
            tool_error: None,
            parse_errors: 0,
            continuing: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        self.tools.tools()
    }

    /// The id the next request will carry.
    pub fn request_counter(&self) -> u64 {
        self.next_request_id
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_continuing(&self) -> bool {
        self.continuing
    }

    /// Mark the session as finished; no further server will be tested.
    pub fn end(&mut self) {
        self.continuing = false;
    }

    /// Run the whole handshake against `command`.
    ///
    /// Failures are reported and recorded in the outcome rather than returned.
    /// The server process is always terminated before this returns.
    #[instrument(skip_all, fields(session = %self.id, command = %command))]
    pub async fn run(&mut self, command: &ServerCommand) -> SessionOutcome {
        if let Err(e) = self.start(command).await {
            self.report_failure(&e).await;
            self.terminate().await;
            return self.outcome(Some(e));
        }

        let mut failure = None;
        while self.step < Step::Closing {
            if let Err(e) = self.send_next_step().await {
                self.report_failure(&e).await;
                failure = Some(e);
                self.enter(Step::Closing);
                self.close_step().await;
            }
        }

        self.terminate().await;
        self.outcome(failure)
    }

    /// Spawn the server, send `initialize`, and process its response.
    ///
    /// The step pointer stays on [`Step::Initializing`].
    pub async fn start(&mut self, command: &ServerCommand) -> Result<()> {
        self.terminate().await;
        self.command = Some(command.clone());

        Output::info(&format!("Starting MCP server: {}", command));
        self.transport = Some(StdioTransport::spawn(command)?);
        info!(command = %command, "MCP server started");

        self.enter(Step::Initializing);
        let params = InitializeParams {
            protocol_version: self.settings.client.protocol_version.clone(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: self.settings.client.name.clone(),
                version: self.settings.client.version.clone(),
            },
        };
        let response = self
            .request(Step::Initializing.method(), serde_json::to_value(params)?)
            .await?;
        Self::recover(self.handle_response(&response))
    }

    /// Process a response to the current step's request.
    ///
    /// A `tools/list` result with a `tools` array fills the tool cache.
    pub fn handle_response(&mut self, response: &JsonRpcResponse) -> Result<()> {
        if self.settings.display.echo_messages {
            Output::message("<<< Received response:", response);
        }

        if let Some(error) = &response.error {
            if self.step == Step::CallingTool {
                self.tool_error = Some(error.message.clone());
                return Err(ProbeError::ToolCall(format!(
                    "JSON-RPC error {}: {}",
                    error.code, error.message
                )));
            }
            return Err(ProbeError::Rpc {
                code: error.code,
                message: error.message.clone(),
            });
        }

        let result = response.result.clone().unwrap_or(Value::Null);
        match self.step {
            Step::Initializing => {
                if let Some(server) = result.get("serverInfo") {
                    let name = server.get("name").and_then(Value::as_str).unwrap_or("unknown");
                    let version = server.get("version").and_then(Value::as_str).unwrap_or("?");
                    Output::success(&format!("Connected to {} {}", name, version));
                }
            }
            Step::ListingTools => {
                let count = self.tools.capture(&result);
                if count == 0 {
                    Output::warning("Server returned no tools");
                } else {
                    Output::success(&format!("Found {} available tools:", count));
                    for (i, tool) in self.tools.tools().iter().enumerate() {
                        Output::list_item(&format!(
                            "{}. {} - {}",
                            i + 1,
                            tool.name,
                            tool.description.as_deref().unwrap_or("No description")
                        ));
                    }
                }
            }
            Step::CallingTool => {
                if result.get("isError").and_then(Value::as_bool) == Some(true) {
                    let message = tool_text(&result).unwrap_or_else(|| "tool reported an error".into());
                    self.tool_error = Some(message.clone());
                    return Err(ProbeError::ToolCall(message));
                }
                let summary = tool_text(&result).unwrap_or_else(|| result.to_string());
                Output::success(&format!("Tool returned: {}", Output::preview(&summary, 200)));
                self.tool_result = Some(result);
            }
            _ => {}
        }

        Ok(())
    }

    /// Advance the step pointer and perform the new step.
    pub async fn send_next_step(&mut self) -> Result<()> {
        let Some(next) = self.step.next() else {
            Output::info("All steps completed.");
            return Ok(());
        };

        pause(self.settings.session.step_delay()).await;
        self.enter(next);

        match next {
            Step::Initializing => {}
            Step::Negotiating => {
                let notification = JsonRpcRequest::notification(INITIALIZED_NOTIFICATION, json!({}));
                if self.settings.display.echo_messages {
                    Output::message(">>> Sending notification (initialized):", &notification);
                }
                self.transport()?.notify(&notification).await?;
                Output::info("Sent initialized notification, continuing without a reply.");
            }
            Step::Authenticating => {
                Output::info("Most MCP servers need no explicit authentication; skipping.");
            }
            Step::ListingTools => {
                let response = self.request(next.method(), json!({})).await?;
                Self::recover(self.handle_response(&response))?;
            }
            Step::ParsingTools => {
                self.render_tools();
                pause(self.settings.session.parse_delay()).await;
            }
            Step::CallingTool => {
                let preferred = self.settings.session.tool.clone();
                match self.tools.select(preferred.as_deref()).cloned() {
                    Some(tool) => {
                        Output::info(&format!("Calling tool '{}'", tool.name));
                        self.called_tool = Some(tool.name.clone());
                        let params = ToolCallParams {
                            name: tool.name,
                            arguments: self.settings.session.tool_arguments.clone(),
                        };
                        let response = self
                            .request(next.method(), serde_json::to_value(params)?)
                            .await?;
                        Self::recover(self.handle_response(&response))?;
                    }
                    None => Output::warning("No tools available; skipping the call."),
                }
            }
            Step::Closing => self.close_step().await,
        }

        Ok(())
    }

    /// Terminate any server and return to a fresh first step.
    pub async fn reset(&mut self) {
        self.terminate().await;
        self.id = Uuid::new_v4();
        self.step = Step::Initializing;
        self.next_request_id = FIRST_REQUEST_ID;
        self.request_ids.clear();
        self.tools.clear();
        self.called_tool = None;
        self.tool_result = None;
        self.tool_error = None;
        self.parse_errors = 0;
        debug!(session = %self.id, "Session reset");
    }

    /// Reset, then run the handshake against a new server.
    pub async fn reset_for_new_test(&mut self, command: &ServerCommand) -> SessionOutcome {
        self.reset().await;
        Output::banner("Preparing to test a new MCP server");
        self.run(command).await
    }

    /// Stop the server process, if one is running.
    pub async fn terminate(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.shutdown().await;
            self.parse_errors += transport.parse_errors();
            debug!(session = %self.id, "MCP server terminated");
        }
    }

    fn enter(&mut self, step: Step) {
        debug_assert!(step >= self.step, "steps only move forward");
        self.step = step;
        info!(step = %step, index = step.index(), "Entering step");
        Output::step_header(step);
        if self.settings.display.show_docs {
            Output::step_doc(step);
        }
    }

    async fn close_step(&mut self) {
        Output::success("Current MCP server test finished.");
        Output::banner("MCP client interaction flow complete");
        if self.is_running() {
            self.terminate().await;
            Output::info("Server process terminated.");
        }
    }

    fn render_tools(&self) {
        Output::info("Parsing tool list...");
        if self.tools.is_empty() {
            Output::warning("No tool information was received.");
        } else {
            Output::success(&format!("Parsed {} tools:", self.tools.len()));
            for tool in self.tools.tools() {
                Output::kv("Tool", &tool.name);
                Output::kv(
                    "Description",
                    tool.description.as_deref().unwrap_or("No description"),
                );
                if tool.input_schema.is_some() {
                    let params = tool.parameter_names();
                    let params = if params.is_empty() {
                        "(none)".to_string()
                    } else {
                        params.join(", ")
                    };
                    Output::kv("Parameters", &params);
                }
                println!();
            }
        }
        Output::info("Tool parsing complete.");
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<JsonRpcResponse> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.request_ids.push(id);

        let request = JsonRpcRequest::new(id, method, params);
        if self.settings.display.echo_messages {
            Output::message(&format!(">>> Sending request ({}):", method), &request);
        }
        debug!(id, method, "Sending request");

        let timeout = self.settings.session.request_timeout();
        let transport = self.transport()?;
        let spinner = Output::spinner(&format!("Waiting for {} response...", method));
        let response = transport.request(&request, timeout).await;
        spinner.finish_and_clear();
        response
    }

    fn transport(&self) -> Result<&StdioTransport> {
        self.transport.as_ref().ok_or(ProbeError::ServerClosed)
    }

    /// Report errors that do not end the attempt and swallow them.
    fn recover(result: Result<()>) -> Result<()> {
        match result {
            Err(e) if !e.ends_attempt() => {
                warn!(error = %e, "Continuing after recoverable error");
                Output::warning(&e.to_string());
                Ok(())
            }
            other => other,
        }
    }

    async fn report_failure(&self, error: &ProbeError) {
        warn!(session = %self.id, step = %self.step, error = %error, "Attempt ended early");
        Output::error(&format!("Step {} failed: {}", self.step, error));

        let Some(transport) = &self.transport else {
            return;
        };
        if let Some(status) = transport.exit_status().await {
            Output::kv("Server exit status", &status.to_string());
        }
        let stderr = transport.stderr_tail();
        if !stderr.is_empty() {
            Output::kv("Server stderr", "");
            for line in stderr {
                println!("    {}", line);
            }
        }
    }

    fn outcome(&self, failure: Option<ProbeError>) -> SessionOutcome {
        SessionOutcome {
            session_id: self.id,
            command: self
                .command
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            final_step: self.step,
            tools: self.tools.tools().to_vec(),
            called_tool: self.called_tool.clone(),
            tool_result: self.tool_result.clone(),
            tool_error: self.tool_error.clone(),
            parse_errors: self.parse_errors,
            request_ids: self.request_ids.clone(),
            failure,
        }
    }
}

/// Joined text content of a tool result, if it has any.
fn tool_text(result: &Value) -> Option<String> {
    let texts: Vec<&str> = result
        .get("content")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n"))
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_settings() -> Settings {
        let mut settings = Settings::default();
        settings.session.step_delay_ms = 0;
        settings.session.parse_delay_ms = 0;
        settings.session.request_timeout_secs = 5;
        settings.display.echo_messages = false;
        settings.display.show_docs = false;
        settings
    }

    fn response(result: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(Some(json!(1)), result)
    }

    #[test]
    fn test_new_session_starts_at_first_step() {
        let session = Session::new(quiet_settings());
        assert_eq!(session.step(), Step::Initializing);
        assert_eq!(session.request_counter(), 1);
        assert!(session.tools().is_empty());
        assert!(session.is_continuing());
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_spawn_failure_keeps_first_step() {
        let mut session = Session::new(quiet_settings());
        let command = ServerCommand::parse("no-such-mcp-server-for-tests").unwrap();

        let outcome = session.run(&command).await;

        assert!(matches!(outcome.failure, Some(ProbeError::Spawn { .. })));
        assert_eq!(outcome.final_step, Step::Initializing);
        assert!(!outcome.reached_close());
        assert!(outcome.request_ids.is_empty());
        assert!(!session.is_running());
    }

    #[test]
    fn test_tools_list_response_fills_cache() {
        let mut session = Session::new(quiet_settings());
        session.step = Step::ListingTools;

        session
            .handle_response(&response(json!({
                "tools": [{"name": "ping", "inputSchema": {"type": "object", "properties": {}}}]
            })))
            .unwrap();

        assert_eq!(session.tools().len(), 1);
        assert_eq!(session.tools()[0].name, "ping");
    }

    #[test]
    fn test_tools_outside_list_step_are_ignored() {
        let mut session = Session::new(quiet_settings());
        session
            .handle_response(&response(json!({"tools": [{"name": "ping"}]})))
            .unwrap();
        assert!(session.tools().is_empty());
    }

    #[test]
    fn test_tool_error_payload_is_tool_call_error() {
        let mut session = Session::new(quiet_settings());
        session.step = Step::CallingTool;

        let err = session
            .handle_response(&JsonRpcResponse::error(Some(json!(3)), -32000, "boom"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::ToolCall(_)));
        assert!(!err.ends_attempt());
        assert_eq!(session.tool_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_tool_is_error_result() {
        let mut session = Session::new(quiet_settings());
        session.step = Step::CallingTool;

        let err = session
            .handle_response(&response(json!({
                "content": [{"type": "text", "text": "bad input"}],
                "isError": true
            })))
            .unwrap_err();
        assert!(matches!(err, ProbeError::ToolCall(ref m) if m == "bad input"));
    }

    #[test]
    fn test_recover_swallows_only_recoverable_errors() {
        assert!(Session::recover(Err(ProbeError::Rpc { code: 1, message: "x".into() })).is_ok());
        assert!(Session::recover(Err(ProbeError::ServerClosed)).is_err());
    }

    #[test]
    fn test_tool_text() {
        assert_eq!(
            tool_text(&json!({"content": [{"type": "text", "text": "pong"}]})).as_deref(),
            Some("pong")
        );
        assert_eq!(tool_text(&json!("pong")), None);
        assert_eq!(tool_text(&json!({"content": []})), None);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let mut session = Session::new(quiet_settings());
        let first_id = session.id();
        session.step = Step::CallingTool;
        session.next_request_id = 4;
        session.request_ids = vec![1, 2, 3];
        session.tools.capture(&json!({"tools": [{"name": "ping"}]}));

        session.reset().await;

        assert_eq!(session.step(), Step::Initializing);
        assert_eq!(session.request_counter(), 1);
        assert!(session.tools().is_empty());
        assert_ne!(session.id(), first_id);
    }
}
