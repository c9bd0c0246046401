use std::process::ExitCode;

use anyhow::Error;
use rmcp::ServiceExt;
use serde_json::json;

use crate::{
    lib::{
        errors::MCP_CLIENT_REQUIRED_ERROR,
        telemetry::{self, ServerStartTelemetry},
    },
    server::runtime::{build_instructions, framing, DocumentServer},
    tools::documents::DocumentStore,
};

const MCP_CLIENT_REQUIRED_EXIT: u8 = 44;

/// Bundles a runtime error message with an exit code and optional structured error data.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
    error_data: Option<rmcp::model::ErrorData>,
}

impl RuntimeExit {
    pub fn structured(error: rmcp::model::ErrorData, exit_code: ExitCode) -> Self {
        Self {
            message: error.message.to_string(),
            exit_code,
            error_data: Some(error),
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:#}"),
            exit_code: ExitCode::FAILURE,
            error_data: None,
        }
    }

    pub fn report(self) -> ExitCode {
        if let Some(data) = self.error_data {
            if let Ok(serialized) = serde_json::to_string(&data) {
                eprintln!("{serialized}");
            } else {
                eprintln!("{}", data.message);
            }
        } else {
            eprintln!("error: {}", self.message);
        }
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn error_data(&self) -> Option<&rmcp::model::ErrorData> {
        self.error_data.as_ref()
    }
}

/// Serve the seeded document registry over stdio until the client closes stdin.
pub async fn run_server() -> Result<(), RuntimeExit> {
    ensure_invoked_via_mcp_client()?;

    let store = DocumentStore::seeded();
    let instructions = build_instructions(store.len().await);
    let server = DocumentServer::new(store, instructions.clone());

    telemetry::emit_server_started(&ServerStartTelemetry {
        transport: "stdio",
        documents: server.store().len().await,
        tools: server.tool_count(),
        prompts: server.prompt_count(),
        instructions: &instructions,
    });

    let (transport, relay) = framing::relay_lines(tokio::io::stdin(), tokio::io::stdout());
    // The only input is stdin, so a failed initialize means the client went away.
    let running = match server.serve(transport).await {
        Ok(running) => running,
        Err(err) => {
            tracing::info!(
                target: "mcp_chat::runtime",
                reason = %err,
                "Client disconnected before initialization"
            );
            return relay.finish().await.map_err(RuntimeExit::from_error);
        }
    };
    let reason = running.waiting().await.map_err(RuntimeExit::from_error)?;
    relay.finish().await.map_err(RuntimeExit::from_error)?;
    tracing::info!(
        target: "mcp_chat::runtime",
        reason = ?reason,
        "Document MCP server stopped"
    );
    Ok(())
}

/// Refuse to run on a terminal: the server speaks JSON-RPC on stdio and is
/// meant to be spawned by a client.
fn ensure_invoked_via_mcp_client() -> Result<(), RuntimeExit> {
    use std::io::IsTerminal;
    let stdin_tty = std::io::stdin().is_terminal();
    let stdout_tty = std::io::stdout().is_terminal();
    if !stdin_tty && !stdout_tty {
        return Ok(());
    }
    let data = MCP_CLIENT_REQUIRED_ERROR
        .builder()
        .retryable(true)
        .details(json!({
            "stdin_is_tty": stdin_tty,
            "stdout_is_tty": stdout_tty
        }))
        .with_exit_code_value(MCP_CLIENT_REQUIRED_EXIT)
        .build()
        .map_err(RuntimeExit::from_error)?;
    Err(RuntimeExit::structured(
        data,
        ExitCode::from(MCP_CLIENT_REQUIRED_EXIT),
    ))
}
