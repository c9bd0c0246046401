//! MCP client side: per-server connections and the orchestrator over them.
pub mod bridge;
pub mod catalog;
pub mod connection;
pub mod errors;
pub mod orchestrator;

pub use catalog::{
    MessageRole, PromptDescriptor, PromptFragment, PromptParameter, RegistrySnapshot,
    ResourceDescriptor, Tagged, ToolDescriptor, ToolOutput,
};
pub use connection::{ConnectionSettings, ServerConnection, ServerLaunchConfig};
pub use errors::{ConnectionError, OrchestratorError, ShutdownFailure};
pub use orchestrator::{CapabilityNamespace, Orchestrator};
