//! mcp-probe - step through the MCP handshake
//!
//! An interactive client that launches an MCP (Model Context Protocol) server
//! as a subprocess and walks it through the protocol one step at a time,
//! printing every JSON-RPC message it sends and receives.
//!
//! # Overview
//!
//! A session runs seven steps against one server:
//!
//! 1. `initialize` - declare client capabilities
//! 2. `initialized` - one-way notification
//! 3. `auth` - pass-through, most servers skip it
//! 4. `tools/list` - fetch the advertised tools
//! 5. parse tools - render names, descriptions and parameters
//! 6. `tools/call` - invoke one tool
//! 7. close - terminate the server, then optionally test another one
//!
//! # Architecture
//!
//! - `mcp` - protocol types, stdio transport, session state machine, driver
//! - `config` - TOML settings
//! - `cli` - command-line surface, console output and prompts
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_probe::config::Settings;
//! use mcp_probe::mcp::{Driver, RunOnce, ServerCommand};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let command = ServerCommand::parse("npx -y @modelcontextprotocol/server-filesystem .")?;
//!     let mut driver = Driver::new(Settings::load()?, RunOnce);
//!
//!     for outcome in driver.run(command).await? {
//!         println!("{}: {} tools", outcome.command, outcome.tools.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;

pub use error::{ProbeError, Result};
