use std::io;

use thiserror::Error;

/// Failures of a single server connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to launch `{command}` for server `{identifier}`: {source}")]
    Spawn {
        identifier: String,
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("handshake with server `{identifier}` failed: {reason}")]
    HandshakeFailed { identifier: String, reason: String },
    #[error("connection to server `{identifier}` lost: {reason}")]
    ConnectionLost { identifier: String, reason: String },
    #[error("server `{identifier}` reported not found: {message}")]
    NotFound { identifier: String, message: String },
    #[error("server `{identifier}` rejected the arguments: {message}")]
    InvalidArgument { identifier: String, message: String },
    #[error("server `{identifier}` returned error {code}: {message}")]
    Remote {
        identifier: String,
        code: i32,
        message: String,
    },
    #[error("failed to stop server `{identifier}`: {source}")]
    Shutdown {
        identifier: String,
        #[source]
        source: io::Error,
    },
}

/// One connection that could not be closed cleanly.
#[derive(Debug)]
pub struct ShutdownFailure {
    pub identifier: String,
    pub source: ConnectionError,
}

/// Failures surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to start server `{identifier}`: {source}")]
    StartupFailed {
        identifier: String,
        #[source]
        source: ConnectionError,
    },
    #[error("server identifier `{identifier}` is configured more than once")]
    DuplicateIdentifier { identifier: String },
    #[error("no connected server provides tool `{name}`")]
    UnknownTool { name: String },
    #[error("no connected server provides resource `{uri}`")]
    UnknownResource { uri: String },
    #[error("no connected server provides prompt `{name}`")]
    UnknownPrompt { name: String },
    #[error("server `{identifier}` failed: {source}")]
    Connection {
        identifier: String,
        #[source]
        source: ConnectionError,
    },
    #[error("failed to close {} connection(s): {}", .failures.len(), summarize(.failures))]
    ShutdownFailed { failures: Vec<ShutdownFailure> },
}

fn summarize(failures: &[ShutdownFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.identifier, failure.source))
        .collect::<Vec<_>>()
        .join("; ")
}
