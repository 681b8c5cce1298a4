//! CLI output formatting utilities.

use crate::mcp::Step;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a centered title between two rules.
    pub fn banner(title: &str) {
        let rule = "=".repeat(60);
        println!("\n{}", style(&rule).dim());
        println!("{:^60}", style(title).bold());
        println!("{}\n", style(&rule).dim());
    }

    /// Print the header of a handshake step with its progress line.
    pub fn step_header(step: Step) {
        let rule = "=".repeat(60);
        println!("\n{}", style(&rule).dim());
        println!(
            "{} {}/{}: {}",
            style("MCP step").bold(),
            step.index(),
            Step::COUNT,
            style(step.title()).bold().cyan()
        );
        println!("{}", step.progress());
        println!("{}\n", style(&rule).dim());
    }

    /// Print the protocol description of a step.
    pub fn step_doc(step: Step) {
        println!("{} {}\n", style("Protocol:").dim(), step.doc());
    }

    /// Pretty-print a JSON-RPC message under a direction label.
    pub fn message<T: Serialize>(label: &str, message: &T) {
        let body = serde_json::to_string_pretty(message)
            .unwrap_or_else(|e| format!("<unserializable message: {}>", e));
        println!("\n{}", style(label).magenta().bold());
        println!("{}\n", body);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Single-line preview of `content`, truncated with an ellipsis.
    pub fn preview(content: &str, max_len: usize) -> String {
        let content = content.replace('\n', " ");
        if content.chars().count() <= max_len {
            content
        } else {
            let cut: String = content.chars().take(max_len).collect();
            format!("{}...", cut)
        }
    }
}
