//! Configuration settings for mcp-probe.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// MCP protocol revision sent in `initialize` by default.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub client: ClientSettings,
    pub session: SessionSettings,
    pub display: DisplaySettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Identity and protocol revision announced during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Client name sent as `clientInfo.name`.
    pub name: String,
    /// Client version sent as `clientInfo.version`.
    pub version: String,
    /// Protocol version sent as `protocolVersion`.
    pub protocol_version: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            name: "mcp-probe".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

/// Handshake pacing and tool-call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum seconds to wait for any single response. 0 waits forever.
    pub request_timeout_secs: u64,
    /// Pause before each step transition, in milliseconds.
    pub step_delay_ms: u64,
    /// Pause after rendering the parsed tool list, in milliseconds.
    pub parse_delay_ms: u64,
    /// Tool to call instead of the first advertised one, if the server has it.
    pub tool: Option<String>,
    /// JSON object passed as `arguments` to `tools/call`.
    pub tool_arguments: serde_json::Map<String, serde_json::Value>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            step_delay_ms: 1000,
            parse_delay_ms: 2000,
            tool: None,
            tool_arguments: serde_json::Map::new(),
        }
    }
}

impl SessionSettings {
    /// The per-request timeout, or `None` for an unbounded wait.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn parse_delay(&self) -> Duration {
        Duration::from_millis(self.parse_delay_ms)
    }
}

/// Console rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Print a short description of each protocol step.
    pub show_docs: bool,
    /// Echo every request and response as pretty JSON.
    pub echo_messages: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_docs: true,
            echo_messages: true,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ProbeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mcp-probe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}
