//! CLI entrypoint module structure.
use anyhow::{Context, Result};
use tracing::Instrument;

use crate::{
    agent::{AnthropicService, ChatAgent, ResilientAgent},
    client::Orchestrator,
    config::AppConfig,
    lib::telemetry::SessionSpan,
};

pub mod args;
pub mod profile;
pub mod session;

pub use args::{CliCommand, LaunchProfileArgs, ParsedCommand};
pub use profile::{
    build_launch_configs, doc_server_launch, resolve_config_source, resolve_overrides,
    LaunchProfile, DOC_SERVER_ID,
};
pub use session::ShutdownSignals;

/// Launch every server, run the chat session, and shut the servers down.
/// Errors are configuration or startup failures; model failures never
/// reach this level.
pub async fn run_chat(profile: LaunchProfile, config: AppConfig) -> Result<()> {
    let launches = build_launch_configs(
        doc_server_launch()?,
        &profile.server_commands,
        &config.servers,
    )?;
    let completion = AnthropicService::new(&config.completion)
        .context("failed to build the completion client")?;
    let max_tool_rounds = config.completion.max_tool_rounds;
    let mut signals =
        ShutdownSignals::install().context("failed to install signal handlers")?;
    let session_span = SessionSpan::start(if profile.once.is_some() { "once" } else { "interactive" });
    let span = session_span.span().clone();

    // Signals end the body normally, so the scope still shuts every server down.
    let turns = Orchestrator::scope(
        launches,
        config.connection.clone(),
        async move |orchestrator: &Orchestrator| -> Result<usize> {
            let chat = ChatAgent::new(orchestrator, Box::new(completion), max_tool_rounds);
            let mut agent = ResilientAgent::new(chat);
            match &profile.once {
                Some(query) => session::run_once(&mut agent, query, &mut signals).await,
                None => session::run_interactive(&mut agent, &mut signals).await,
            }
        },
    )
    .instrument(span)
    .await?;

    session_span.finish(turns);
    Ok(())
}
