//! Run command: drive the handshake against one or more servers.

use crate::cli::prompt::{self, ConsolePrompt};
use crate::cli::{Output, RunArgs};
use crate::config::Settings;
use crate::error::{ProbeError, Result};
use crate::mcp::{Driver, Operator, RunOnce, ServerCommand, SessionOutcome, Step};
use console::style;
use serde_json::Value;

/// Exit code used when the operator interrupts with Ctrl+C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    /// Ctrl+C. Servers are already terminated, but a prompt's stdin read may
    /// still be blocked, so the caller should exit without waiting on it.
    Interrupted,
}

/// Run the handshake command.
pub async fn run_probe(args: &RunArgs, mut settings: Settings) -> anyhow::Result<RunStatus> {
    apply_overrides(args, &mut settings)?;

    let command = if args.server.is_empty() {
        prompt::print_wizard();
        match prompt::read_line("Enter command: ").await {
            Ok(Some(line)) if !line.is_empty() => ServerCommand::parse(&line)?,
            Ok(_) => {
                Output::error("Command cannot be empty.");
                return Ok(RunStatus::Finished);
            }
            Err(ProbeError::UserAbort) => {
                Output::info("Interrupted, exiting.");
                return Ok(RunStatus::Interrupted);
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        ServerCommand::from_parts(&args.server)?
    };

    Output::info("Running MCP client... (press Ctrl+C to exit)");

    let result = if args.once {
        drive(settings, RunOnce, command).await
    } else {
        drive(settings, ConsolePrompt, command).await
    };

    let status = match result {
        Ok(outcomes) => {
            print_summary(&outcomes);
            RunStatus::Finished
        }
        Err(ProbeError::UserAbort) => {
            Output::info("Interrupted by user, exiting.");
            RunStatus::Interrupted
        }
        Err(e) => return Err(e.into()),
    };

    Output::info("Program exited.");
    Ok(status)
}

/// Run the driver, aborting on Ctrl+C.
///
/// Dropping the driver kills the server process, so an interrupt at any step
/// still terminates it.
async fn drive<O: Operator>(
    settings: Settings,
    operator: O,
    command: ServerCommand,
) -> Result<Vec<SessionOutcome>> {
    let mut driver = Driver::new(settings, operator);
    tokio::select! {
        result = driver.run(command) => result,
        _ = tokio::signal::ctrl_c() => {
            println!();
            Err(ProbeError::UserAbort)
        }
    }
}

/// Apply command-line flags on top of the loaded settings.
fn apply_overrides(args: &RunArgs, settings: &mut Settings) -> Result<()> {
    if let Some(timeout) = args.timeout {
        settings.session.request_timeout_secs = timeout;
    }
    if let Some(tool) = &args.tool {
        settings.session.tool = Some(tool.clone());
    }
    if let Some(raw) = &args.args {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => settings.session.tool_arguments = map,
            _ => {
                return Err(ProbeError::Config(
                    "--args must be a JSON object".to_string(),
                ))
            }
        }
    }
    if args.no_docs {
        settings.display.show_docs = false;
    }
    if args.no_echo {
        settings.display.echo_messages = false;
    }
    if args.no_delay {
        settings.session.step_delay_ms = 0;
        settings.session.parse_delay_ms = 0;
    }
    Ok(())
}

fn print_summary(outcomes: &[SessionOutcome]) {
    Output::header("Summary");
    for outcome in outcomes {
        let status = if outcome.failure.is_none() && outcome.tool_error.is_none() {
            style("ok").green()
        } else {
            style("problems").yellow()
        };
        println!("\n  {} [{}]", style(&outcome.command).bold(), status);
        Output::kv(
            "Reached step",
            &format!(
                "{}/{} ({})",
                outcome.final_step.index(),
                Step::COUNT,
                outcome.final_step
            ),
        );
        Output::kv("Tools", &outcome.tools.len().to_string());
        if let Some(tool) = &outcome.called_tool {
            Output::kv("Called", tool);
        }
        if let Some(error) = &outcome.tool_error {
            Output::kv("Tool error", error);
        }
        if outcome.parse_errors > 0 {
            Output::kv("Malformed lines", &outcome.parse_errors.to_string());
        }
        if let Some(failure) = &outcome.failure {
            Output::kv("Failure", &failure.to_string());
        }
    }
    println!();
}
