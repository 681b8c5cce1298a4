//! mcp-probe CLI entry point.

use anyhow::Result;
use clap::Parser;
use mcp_probe::cli::{commands, Cli, Commands};
use mcp_probe::config::Settings;
use mcp_probe::mcp::EchoBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging. Everything goes to stderr so the echo server's
    // stdout carries only JSON-RPC.
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("mcp_probe={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Execute command
    match &cli.command {
        Commands::Run(args) => {
            if commands::run_probe(args, settings).await? == commands::RunStatus::Interrupted {
                // Dropping the runtime would wait for the blocked stdin read.
                std::process::exit(commands::INTERRUPTED_EXIT_CODE);
            }
        }

        Commands::EchoServer {
            no_tools,
            malformed,
            fail_call,
            tool_error,
        } => {
            commands::run_echo_server(EchoBehavior {
                omit_tools: *no_tools,
                malformed_lines: *malformed,
                fail_calls: *fail_call,
                tool_errors: *tool_error,
            })?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
