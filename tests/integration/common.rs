use std::{path::PathBuf, process::Stdio, time::Duration};

use anyhow::{Context, Result};
use mcp_chat::client::{bridge::ChildIoBridge, ConnectionSettings, ServerLaunchConfig};
use tokio::{
    io::AsyncReadExt,
    process::{Child, Command},
    task::JoinHandle,
};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_mcp-chat");

/// Environment the chat client reads; cleared so the host cannot leak in.
pub const CLIENT_ENV_KEYS: &[&str] = &[
    "CLAUDE_MODEL",
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_BASE_URL",
    "MCP_CHAT_CONFIG",
    "RUST_LOG",
];

pub async fn spawn_server_process() -> Result<(Child, ChildIoBridge, Option<JoinHandle<()>>)> {
    let mut command = Command::new(BINARY_PATH);
    command
        .arg("serve")
        .stdout(Stdio::piped())
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = command.spawn().context("failed to spawn server process")?;
    let stdout = child.stdout.take().context("child stdout")?;
    let stdin = child.stdin.take().context("child stdin")?;
    let bridge = ChildIoBridge::new(stdout, stdin);
    let stderr_handle = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
        })
    });
    Ok((child, bridge, stderr_handle))
}

pub fn fixture(relative: &str) -> String {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.join(relative).display().to_string()
}

/// Launch config for this crate's own document server.
pub fn doc_server(identifier: &str) -> ServerLaunchConfig {
    ServerLaunchConfig::new(identifier, BINARY_PATH, ["serve"])
}

pub fn test_settings() -> ConnectionSettings {
    ConnectionSettings {
        handshake_timeout: Duration::from_secs(20),
        request_timeout: Duration::from_secs(20),
        shutdown_grace: Duration::from_secs(5),
    }
}

/// Whether a process with `pid` still exists (zombies included).
pub fn process_exists(pid: u32) -> bool {
    // SAFETY: signal 0 performs only the existence and permission check.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// `std::process::Command` for the chat client with a clean environment.
pub fn chat_command() -> std::process::Command {
    let mut command = std::process::Command::new(BINARY_PATH);
    for key in CLIENT_ENV_KEYS {
        command.env_remove(key);
    }
    command.stdin(Stdio::null());
    command
}
