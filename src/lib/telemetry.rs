//! Telemetry initialization and session span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Initialize `tracing` and format developer logs.
///
/// Logs always go to stderr: stdout carries protocol frames for `serve`
/// and the answer text for the chat client.
pub fn init_tracing(default_level: &str) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper covering one chat session from startup to shutdown.
pub struct SessionSpan {
    span: Span,
    started_at: Instant,
    session_id: Uuid,
}

impl SessionSpan {
    /// Start a session span.
    pub fn start(mode: &'static str) -> Self {
        let session_id = Uuid::new_v4();
        let span = info_span!(
            target: "mcp_chat::session",
            "chat_session",
            %session_id,
            mode
        );
        Self {
            span,
            started_at: Instant::now(),
            session_id,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Close the span while recording how many turns were answered.
    pub fn finish(self, turns: usize) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "mcp_chat::session",
            session_id = %self.session_id,
            turns = turns,
            elapsed_ms = elapsed_ms,
            "Chat session finished"
        );
    }
}

/// Payload for logging the document server runtime as structured telemetry.
#[derive(Debug, Serialize)]
pub struct ServerStartTelemetry<'a> {
    pub transport: &'a str,
    pub documents: usize,
    pub tools: usize,
    pub prompts: usize,
    pub instructions: &'a str,
}

/// Emit the server start event to `tracing`.
pub fn emit_server_started(telemetry: &ServerStartTelemetry<'_>) {
    info!(
        target: "mcp_chat::runtime",
        transport = telemetry.transport,
        documents = telemetry.documents,
        tools = telemetry.tools,
        prompts = telemetry.prompts,
        instructions = telemetry.instructions,
        "Started document MCP server"
    );
}
