//! Stdio transport to an MCP server subprocess.
//!
//! Sends newline-delimited JSON on the child's stdin and reads
//! newline-delimited JSON from its stdout. A background task reads stdout and
//! hands each response to the request waiting on its id.

use super::protocol::{IncomingMessage, JsonRpcRequest, JsonRpcResponse};
use crate::cli::Output;
use crate::error::{ProbeError, Result};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lines of server stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// An executable and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    program: String,
    args: Vec<String>,
}

impl ServerCommand {
    /// Parse free text by splitting on whitespace.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ProbeError::InvalidCommand("command cannot be empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Build from already-split words, e.g. trailing CLI arguments.
    pub fn from_parts(parts: &[String]) -> Result<Self> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| ProbeError::InvalidCommand("command cannot be empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Requests waiting for a response, keyed by id.
#[derive(Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<u64, oneshot::Sender<JsonRpcResponse>>,
}

/// Communicates with an MCP server over the stdin/stdout of a child process.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: Arc<Mutex<Pending>>,
    parse_errors: Arc<AtomicUsize>,
    stderr_tail: Arc<std::sync::Mutex<VecDeque<String>>>,
    reader_handle: JoinHandle<()>,
    stderr_handle: Option<JoinHandle<()>>,
}

impl StdioTransport {
    /// Spawn the server process with piped stdio and start the reader task.
    pub fn spawn(command: &ServerCommand) -> Result<Self> {
        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                command: command.to_string(),
                source,
            })?;

        debug!(pid = ?child.id(), command = %command, "Spawned MCP server");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProbeError::Transport("child process stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProbeError::Transport("child process stdout not captured".into()))?;

        let pending = Arc::new(Mutex::new(Pending::default()));
        let parse_errors = Arc::new(AtomicUsize::new(0));
        let stderr_tail = Arc::new(std::sync::Mutex::new(VecDeque::new()));

        let reader_handle = tokio::spawn(read_loop(
            stdout,
            Arc::clone(&pending),
            Arc::clone(&parse_errors),
        ));
        let stderr_handle = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(drain_stderr(stderr, Arc::clone(&stderr_tail))));

        Ok(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            parse_errors,
            stderr_tail,
            reader_handle,
            stderr_handle,
        })
    }

    /// Send a request and wait for the response with the same id.
    ///
    /// `timeout` of `None` waits until the server answers or closes stdout.
    pub async fn request(
        &self,
        request: &JsonRpcRequest,
        timeout: Option<Duration>,
    ) -> Result<JsonRpcResponse> {
        let id = request
            .id
            .as_ref()
            .and_then(Value::as_u64)
            .ok_or_else(|| ProbeError::Transport("request has no numeric id".into()))?;

        let rx = {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(ProbeError::ServerClosed);
            }
            let (tx, rx) = oneshot::channel();
            pending.waiters.insert(id, tx);
            rx
        };

        if let Err(e) = self.write(request).await {
            self.pending.lock().await.waiters.remove(&id);
            return Err(e);
        }

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.pending.lock().await.waiters.remove(&id);
                    return Err(ProbeError::Timeout {
                        method: request.method.clone(),
                        elapsed_ms: whole_millis(limit),
                    });
                }
            },
            None => rx.await,
        };

        received.map_err(|_| ProbeError::ServerClosed)
    }

    /// Send a notification. Nothing is awaited.
    pub async fn notify(&self, notification: &JsonRpcRequest) -> Result<()> {
        self.write(notification).await
    }

    async fn write(&self, message: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await.map_err(write_error)?;
        stdin.flush().await.map_err(write_error)?;
        Ok(())
    }

    /// Number of stdout lines that were not valid JSON-RPC.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// The last lines the server wrote to stderr.
    pub fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Exit status, if the server has already exited.
    pub async fn exit_status(&self) -> Option<ExitStatus> {
        self.child.lock().await.try_wait().ok().flatten()
    }

    /// Terminate the server and fail any outstanding requests.
    pub async fn shutdown(&self) {
        {
            let mut pending = self.pending.lock().await;
            pending.closed = true;
            pending.waiters.clear();
        }

        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!(error = %e, "MCP server already exited");
        }
        self.reader_handle.abort();
        if let Some(handle) = &self.stderr_handle {
            handle.abort();
        }
    }
}

fn write_error(e: std::io::Error) -> ProbeError {
    if e.kind() == std::io::ErrorKind::BrokenPipe {
        ProbeError::ServerClosed
    } else {
        ProbeError::Transport(format!("failed to write to server stdin: {}", e))
    }
}

/// Read stdout until end-of-stream, routing responses to their waiters.
async fn read_loop<R>(stdout: R, pending: Arc<Mutex<Pending>>, parse_errors: Arc<AtomicUsize>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("MCP server closed stdout");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                dispatch_line(line, &pending, &parse_errors).await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read MCP server output");
                break;
            }
        }
    }

    let mut pending = pending.lock().await;
    pending.closed = true;
    pending.waiters.clear();
}

async fn dispatch_line(line: &str, pending: &Mutex<Pending>, parse_errors: &AtomicUsize) {
    let message: IncomingMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            parse_errors.fetch_add(1, Ordering::Relaxed);
            let err = ProbeError::ProtocolParse(e.to_string());
            warn!(error = %err, "Ignoring unparseable server output");
            Output::error(&format!("Failed to parse response: {}", e));
            Output::kv("Raw response", &Output::preview(line, 200));
            return;
        }
    };

    if let Some(method) = &message.method {
        debug!(method = %method, "Ignoring server-initiated message");
        return;
    }

    let Some(response) = message.into_response() else {
        return;
    };

    let Some(id) = response.numeric_id() else {
        warn!(response = ?response, "Dropping response without a numeric id");
        return;
    };

    match pending.lock().await.waiters.remove(&id) {
        Some(waiter) => {
            let _ = waiter.send(response);
        }
        None => warn!(id, "Dropping response for unknown request id"),
    }
}

async fn drain_stderr<R>(stderr: R, tail: Arc<std::sync::Mutex<VecDeque<String>>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "mcp_probe::server_stderr", "{}", line);
        if let Ok(mut tail) = tail.lock() {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
