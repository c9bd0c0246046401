//! Conversational agent: completion client, tool-use loop, and the
//! resilient wrapper the CLI talks to.
use async_trait::async_trait;
use thiserror::Error;

use crate::client::OrchestratorError;

pub mod arithmetic;
pub mod chat;
pub mod completion;
pub mod fallback;
pub mod resilient;

pub use chat::ChatAgent;
pub use completion::{AnthropicService, CompletionError, CompletionService};
pub use resilient::ResilientAgent;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error("model still requested tools after {rounds} tool rounds")]
    ToolRoundsExhausted { rounds: usize },
    #[error("prompt command needs a name, as in `/summarize plan.md`")]
    EmptyCommand,
}

/// Anything that turns a user query into an answer.
#[async_trait(?Send)]
pub trait Agent {
    async fn answer(&mut self, query: &str) -> Result<String, AgentError>;
}
