//! The seven handshake steps and their console text.

use std::fmt;

/// One step of the handshake, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Initializing,
    Negotiating,
    Authenticating,
    ListingTools,
    ParsingTools,
    CallingTool,
    Closing,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Initializing,
        Step::Negotiating,
        Step::Authenticating,
        Step::ListingTools,
        Step::ParsingTools,
        Step::CallingTool,
        Step::Closing,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// 1-based position in the sequence.
    pub fn index(self) -> usize {
        self as usize + 1
    }

    /// The step after this one, or `None` after closing.
    pub fn next(self) -> Option<Step> {
        Self::ALL.get(self.index()).copied()
    }

    /// Protocol method (or local action) performed in this step.
    pub fn method(self) -> &'static str {
        match self {
            Step::Initializing => "initialize",
            Step::Negotiating => "initialized",
            Step::Authenticating => "auth",
            Step::ListingTools => "tools/list",
            Step::ParsingTools => "parse_tools",
            Step::CallingTool => "tools/call",
            Step::Closing => "close",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Initializing => "Initialize connection",
            Step::Negotiating => "Protocol negotiation",
            Step::Authenticating => "Authentication",
            Step::ListingTools => "List tools",
            Step::ParsingTools => "Parse tool list",
            Step::CallingTool => "Call tool",
            Step::Closing => "Close and loop",
        }
    }

    /// Short description printed under the step header.
    pub fn doc(self) -> &'static str {
        match self {
            Step::Initializing => {
                "Open the connection to the MCP server and declare client capabilities."
            }
            Step::Negotiating => {
                "Notify the server that initialization is complete. No reply is expected."
            }
            Step::Authenticating => {
                "Provide client credentials. Most MCP servers skip this step."
            }
            Step::ListingTools => "Ask the server for every tool it exposes.",
            Step::ParsingTools => "Read names, descriptions and parameters of the listed tools.",
            Step::CallingTool => "Invoke one of the parsed tools to exercise the connection.",
            Step::Closing => "Test another MCP server or exit.",
        }
    }

    /// Progress line: done steps as `✓`, this step as `●`, pending as `○`.
    pub fn progress(self) -> String {
        Self::ALL
            .iter()
            .map(|step| match step.cmp(&self) {
                std::cmp::Ordering::Less => "✓",
                std::cmp::Ordering::Equal => "●",
                std::cmp::Ordering::Greater => "○",
            })
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_linear() {
        let mut step = Step::Initializing;
        let mut seen = vec![step];
        while let Some(next) = step.next() {
            assert!(next > step);
            step = next;
            seen.push(step);
        }
        assert_eq!(seen, Step::ALL.to_vec());
        assert_eq!(step, Step::Closing);
    }

    #[test]
    fn test_indices_are_one_based() {
        assert_eq!(Step::Initializing.index(), 1);
        assert_eq!(Step::Closing.index(), Step::COUNT);
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(Step::Initializing.progress(), "● → ○ → ○ → ○ → ○ → ○ → ○");
        assert_eq!(Step::ListingTools.progress(), "✓ → ✓ → ✓ → ● → ○ → ○ → ○");
        assert_eq!(Step::Closing.progress(), "✓ → ✓ → ✓ → ✓ → ✓ → ✓ → ●");
    }

    #[test]
    fn test_methods() {
        assert_eq!(Step::ListingTools.method(), "tools/list");
        assert_eq!(Step::CallingTool.to_string(), "tools/call");
    }
}
