//! CLI module for mcp-probe.

pub mod commands;
mod output;
pub mod prompt;

pub use output::Output;

use clap::{Args, Parser, Subcommand};

/// mcp-probe - step through the MCP handshake
///
/// Launches an MCP server as a subprocess and walks it through initialize,
/// initialized, auth, tools/list, tool parsing and tools/call, printing every
/// message on the way.
#[derive(Parser, Debug)]
#[command(name = "mcp-probe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the handshake against an MCP server
    Run(RunArgs),

    /// Serve a minimal MCP server with a single `ping` tool on stdio
    EchoServer {
        /// Answer tools/list without a tools array
        #[arg(long)]
        no_tools: bool,

        /// Write a non-JSON line before every response
        #[arg(long)]
        malformed: bool,

        /// Fail every tools/call with a JSON-RPC error
        #[arg(long)]
        fail_call: bool,

        /// Answer every tools/call with an isError result
        #[arg(long, conflicts_with = "fail_call")]
        tool_error: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Stop after the first server instead of offering to test another
    #[arg(long)]
    pub once: bool,

    /// Seconds to wait for each response (0 waits forever)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Tool to call instead of the first one the server lists
    #[arg(long)]
    pub tool: Option<String>,

    /// JSON object passed as the tool call arguments
    #[arg(long)]
    pub args: Option<String>,

    /// Do not print protocol descriptions
    #[arg(long)]
    pub no_docs: bool,

    /// Do not echo JSON-RPC messages
    #[arg(long)]
    pub no_echo: bool,

    /// Skip the pauses between steps
    #[arg(long)]
    pub no_delay: bool,

    /// Server launch command, e.g. `-- npx -y @modelcontextprotocol/server-filesystem .`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub server: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file if none exists
    Init,

    /// Show configuration file path
    Path,
}
