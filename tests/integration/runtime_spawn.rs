use std::{
    process::{Command as StdCommand, Stdio},
    time::Duration,
};

use anyhow::{Context, Result};
use rmcp::{model::ClientInfo, serve_client};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
    time::timeout,
};

use crate::common::{spawn_server_process, BINARY_PATH};

#[tokio::test]
async fn spawned_server_lists_document_tools() -> Result<()> {
    let (mut child, transport, stderr_task) = spawn_server_process().await?;

    let client = serve_client(ClientInfo::default(), transport).await?;
    let list = client.list_tools(None).await?;
    let names: Vec<_> = list.tools.iter().map(|tool| tool.name.as_ref()).collect();
    assert!(names.contains(&"read_doc"), "tools: {names:?}");
    assert!(names.contains(&"edit_doc"), "tools: {names:?}");

    client.cancel().await?;
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(
        status.success(),
        "server should exit cleanly but exit status was {status:?}"
    );
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}

#[tokio::test]
async fn server_exits_zero_when_stdin_closes_before_handshake() -> Result<()> {
    let (mut child, transport, stderr_task) = spawn_server_process().await?;

    drop(transport);
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(status.success(), "exit status was {status:?}");
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}

#[tokio::test]
async fn malformed_lines_get_error_responses_and_service_continues() -> Result<()> {
    let mut child = Command::new(BINARY_PATH)
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;
    let mut stdin = child.stdin.take().context("child stdin")?;
    let stdout = child.stdout.take().context("child stdout")?;

    let initialize = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "line-test", "version": "0.0.0" }
        }
    });
    let input = [
        initialize.to_string(),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        "this is not json".to_string(),
        r#"{"id":2,"method":"tools/list"}"#.to_string(),
        r#"{"jsonrpc":"2.0","id":3,"method":"no/such_method"}"#.to_string(),
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/list"}"#.to_string(),
    ];
    for line in input {
        stdin.write_all(format!("{line}\n").as_bytes()).await?;
    }
    stdin.flush().await?;

    let mut lines = BufReader::new(stdout).lines();
    let mut replies = Vec::new();
    while replies.len() < 5 {
        let line = timeout(Duration::from_secs(10), lines.next_line())
            .await?
            .context("read reply")?
            .context("server closed stdout early")?;
        replies.push(serde_json::from_str::<Value>(&line)?);
    }
    let reply_for = |id: Value| {
        replies
            .iter()
            .find(|reply| reply["id"] == id)
            .cloned()
            .unwrap_or(Value::Null)
    };

    assert_eq!(reply_for(Value::Null)["error"]["code"], -32700);
    assert_eq!(reply_for(json!(3))["error"]["code"], -32601);
    for id in [2, 4] {
        let tools = reply_for(json!(id))["result"]["tools"].clone();
        assert_eq!(tools.as_array().map(Vec::len), Some(2), "reply {id}: {replies:?}");
    }

    drop(stdin);
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(status.success(), "exit status was {status:?}");
    Ok(())
}

#[test]
fn direct_execution_requires_mcp_client() {
    use std::io::IsTerminal;
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        eprintln!("Skipping MCP_CLIENT_REQUIRED test because stdio is not a TTY");
        return;
    }
    let status = StdCommand::new(BINARY_PATH)
        .arg("serve")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .stdin(Stdio::inherit())
        .status()
        .expect("process should start");
    assert_eq!(
        status.code(),
        Some(44),
        "MCP_CLIENT_REQUIRED exit code (44) expected, got {status:?}"
    );
}
