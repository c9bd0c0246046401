//! Library crate root: the document tool server, the MCP client
//! orchestrator, and the chat agent built on them.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod agent;
pub mod cli;
pub mod client;
pub mod config;
pub mod server;
pub mod tools;
