//! MCP (Model Context Protocol) handshake client.
//!
//! Walks a server process through initialize, notify, list and call over
//! JSON-RPC 2.0 on stdio. Also contains a tiny echo server to test against.

mod driver;
mod echo;
pub mod protocol;
mod session;
mod steps;
mod tools;
mod transport;

pub use driver::{Decision, Driver, Operator, RunOnce};
pub use echo::{EchoBehavior, EchoServer, MALFORMED_LINE};
pub use protocol::{InputSchema, ParameterSchema, ToolDescriptor};
pub use session::{Session, SessionOutcome};
pub use steps::Step;
pub use tools::ToolCache;
pub use transport::{ServerCommand, StdioTransport};
