//! Interactive operator prompts.

use crate::cli::Output;
use crate::error::{ProbeError, Result};
use crate::mcp::{Decision, Operator, ServerCommand, SessionOutcome};
use async_trait::async_trait;
use std::io::{BufRead, Write};

/// Asks on the console whether to test another server.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl Operator for ConsolePrompt {
    async fn decide(&mut self, _outcome: &SessionOutcome) -> Result<Decision> {
        println!("Test another MCP server?");
        println!("  1. Yes - test a new server");
        println!("  2. No - exit");

        let Some(choice) = read_line("\nChoose (1/2): ").await? else {
            Output::info("Input closed, exiting.");
            return Ok(Decision::Quit);
        };
        if !wants_another(&choice) {
            Output::info("Exiting.");
            return Ok(Decision::Quit);
        }

        println!("\nEnter the new MCP server launch command:");
        match read_line("Command: ").await? {
            Some(line) if !line.is_empty() => Ok(Decision::NewServer(ServerCommand::parse(&line)?)),
            _ => {
                Output::warning("Command is empty, exiting.");
                Ok(Decision::Quit)
            }
        }
    }
}

/// `1` or `y` (any case) means test another server.
pub fn wants_another(choice: &str) -> bool {
    let choice = choice.trim();
    choice == "1" || choice.eq_ignore_ascii_case("y")
}

/// Read one trimmed line from stdin. `None` at end of input.
///
/// Ctrl+C while waiting yields [`ProbeError::UserAbort`].
pub async fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let n = std::io::stdin().lock().read_line(&mut line)?;
        Ok::<_, std::io::Error>((n, line))
    });

    tokio::select! {
        joined = read => {
            let (n, line) = joined.map_err(std::io::Error::other)??;
            Ok((n > 0).then(|| line.trim().to_string()))
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            Err(ProbeError::UserAbort)
        }
    }
}

/// Print the startup guide shown when no server command was given.
pub fn print_wizard() {
    Output::banner("MCP client setup");
    println!("The client walks the full MCP interaction flow:");
    println!("  1. Initialize connection    2. Protocol negotiation");
    println!("  3. Authentication           4. List tools");
    println!("  5. Parse tool list          6. Call tool");
    println!("  7. Close and loop (test several servers)\n");
    println!("Enter the MCP server launch command. For example:");
    println!("  1) npx -y @modelcontextprotocol/server-filesystem .");
    println!("  2) node your-mcp-server.js");
    println!("  3) python your_mcp_server.py\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_another() {
        assert!(wants_another("1"));
        assert!(wants_another("y"));
        assert!(wants_another(" Y \n"));
        assert!(!wants_another("2"));
        assert!(!wants_another("yes"));
        assert!(!wants_another(""));
    }
}
