//! Error types for mcp-probe.

use thiserror::Error;

/// Library-level error type for probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to spawn MCP server `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid server command: {0}")]
    InvalidCommand(String),

    #[error("Malformed server output: {0}")]
    ProtocolParse(String),

    #[error("Tool call failed: {0}")]
    ToolCall(String),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Request `{method}` timed out after {elapsed_ms}ms")]
    Timeout { method: String, elapsed_ms: u64 },

    #[error("MCP server closed its output before responding")]
    ServerClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Interrupted by operator")]
    UserAbort,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ProbeError {
    /// Whether this error ends the current attempt early.
    ///
    /// Parse and tool-call errors are reported but the handshake keeps going.
    pub fn ends_attempt(&self) -> bool {
        !matches!(
            self,
            ProbeError::ProtocolParse(_) | ProbeError::ToolCall(_) | ProbeError::Rpc { .. }
        )
    }
}

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors_do_not_end_attempt() {
        assert!(!ProbeError::ProtocolParse("x".into()).ends_attempt());
        assert!(!ProbeError::ToolCall("boom".into()).ends_attempt());
        assert!(!ProbeError::Rpc { code: -32601, message: "nope".into() }.ends_attempt());
    }

    #[test]
    fn test_fatal_errors_end_attempt() {
        assert!(ProbeError::ServerClosed.ends_attempt());
        assert!(ProbeError::UserAbort.ends_attempt());
        assert!(ProbeError::Timeout { method: "tools/list".into(), elapsed_ms: 10 }.ends_attempt());
    }

    #[test]
    fn test_spawn_error_message_names_command() {
        let err = ProbeError::Spawn {
            command: "missing-server --flag".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("missing-server --flag"));
    }
}
