//! Configuration module for mcp-probe.
//!
//! Handles loading and saving the TOML settings file.

mod settings;

pub use settings::{
    ClientSettings, DisplaySettings, GeneralSettings, SessionSettings, Settings,
    DEFAULT_PROTOCOL_VERSION,
};
