//! Echo server command implementation.

use crate::mcp::{EchoBehavior, EchoServer};
use anyhow::Result;
use std::io;

/// Serve the echo MCP server on stdin/stdout.
pub fn run_echo_server(behavior: EchoBehavior) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    EchoServer::new(behavior).run(stdin.lock(), stdout.lock())?;
    Ok(())
}
