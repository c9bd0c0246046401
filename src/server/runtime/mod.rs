//! Document MCP server startup and capability registration.
pub mod framing;
mod server_info;
mod startup;
mod tool_registry;

pub use server_info::build_instructions;
pub use startup::{run_server, RuntimeExit};
pub use tool_registry::DocumentServer;
