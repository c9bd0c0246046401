//! MCP tools and prompts registered on the server and helper functions for the routers.

pub mod documents;

use rmcp::handler::server::router::{prompt::PromptRouter, tool::ToolRouter};

pub type ServerToolRouter<S> = ToolRouter<S>;
pub type ServerPromptRouter<S> = PromptRouter<S>;

/// Helper for building a tool router.
pub fn build_router<S>(builder: impl FnOnce() -> ServerToolRouter<S>) -> ServerToolRouter<S>
where
    S: Send + Sync + 'static,
{
    builder()
}

/// Helper for building a prompt router.
pub fn build_prompt_router<S>(
    builder: impl FnOnce() -> ServerPromptRouter<S>,
) -> ServerPromptRouter<S>
where
    S: Send + Sync + 'static,
{
    builder()
}
