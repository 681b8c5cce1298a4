//! CLI command implementations.

mod config;
mod echo;
mod run;

pub use config::run_config;
pub use echo::run_echo_server;
pub use run::{run_probe, RunStatus, INTERRUPTED_EXIT_CODE};
