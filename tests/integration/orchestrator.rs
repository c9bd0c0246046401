use std::{fs, time::Duration};

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tokio::time::timeout;

use mcp_chat::client::{
    ConnectionError, Orchestrator, OrchestratorError, ServerConnection, ServerLaunchConfig,
};

use crate::common::{doc_server, process_exists, test_settings, BINARY_PATH};

fn args(value: Value) -> Map<String, Value> {
    value.as_object().expect("JSON object").clone()
}

#[tokio::test]
async fn connection_exposes_typed_calls() -> Result<()> {
    let mut connection = ServerConnection::open(&doc_server("docs"), test_settings()).await?;

    let tools = connection.list_tools().await?;
    let resources = connection.list_resources().await?;
    let output = connection
        .call_tool("read_doc", args(json!({ "doc_id": "deposition.md" })))
        .await?;
    let missing = connection
        .read_resource("docs://documents/missing.md")
        .await;
    let bad_edit = connection
        .call_tool(
            "edit_doc",
            args(json!({ "doc_id": "plan.md", "old_text": "", "new_text": "x" })),
        )
        .await;
    let unknown_tool = connection.call_tool("delete_doc", Map::new()).await;
    let unknown_prompt = connection.get_prompt("translate", Map::new()).await;
    connection.close().await?;
    connection.close().await?;

    assert_eq!(tools.len(), 2);
    assert!(resources
        .iter()
        .any(|resource| resource.uri_template == "docs://documents/{doc_id}"));
    assert_eq!(
        output.text,
        "This deposition covers the testimony of Angela Smith, P.E."
    );
    assert!(!output.is_error);
    assert!(
        matches!(missing, Err(ConnectionError::NotFound { .. })),
        "{missing:?}"
    );
    assert!(
        matches!(bad_edit, Err(ConnectionError::InvalidArgument { .. })),
        "{bad_edit:?}"
    );
    assert!(
        matches!(unknown_tool, Err(ConnectionError::NotFound { .. })),
        "{unknown_tool:?}"
    );
    assert!(
        matches!(unknown_prompt, Err(ConnectionError::NotFound { .. })),
        "{unknown_prompt:?}"
    );
    assert!(!connection.is_open());
    Ok(())
}

#[tokio::test]
async fn calls_after_close_report_connection_lost() -> Result<()> {
    let mut connection = ServerConnection::open(&doc_server("docs"), test_settings()).await?;
    connection.close().await?;

    let result = connection.list_tools().await;

    assert!(
        matches!(result, Err(ConnectionError::ConnectionLost { .. })),
        "{result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn killed_server_reports_connection_lost() -> Result<()> {
    let mut connection = ServerConnection::open(&doc_server("docs"), test_settings()).await?;
    let pid = connection.pid().context("server pid")?;

    // SAFETY: the pid belongs to a child this test spawned and has not reaped.
    let killed = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
    assert_eq!(killed, 0);
    let result = timeout(
        Duration::from_secs(10),
        connection.call_tool("read_doc", args(json!({ "doc_id": "plan.md" }))),
    )
    .await?;
    connection.close().await?;

    assert!(
        matches!(result, Err(ConnectionError::ConnectionLost { .. })),
        "{result:?}"
    );
    assert!(!process_exists(pid));
    Ok(())
}

#[tokio::test]
async fn orchestrator_merges_and_routes_across_servers() -> Result<()> {
    let mut orchestrator = Orchestrator::start(
        vec![doc_server("first"), doc_server("second")],
        test_settings(),
    )
    .await?;

    let tools = orchestrator.merged_tools();
    let prompts = orchestrator.merged_prompts();
    let output = orchestrator
        .invoke_tool("read_doc", args(json!({ "doc_id": "plan.md" })))
        .await;
    let document = orchestrator
        .read_resource("docs://documents/financials.docx")
        .await;
    let prompt = orchestrator
        .get_prompt("format", args(json!({ "doc_id": "plan.md" })))
        .await;
    let unknown = orchestrator.invoke_tool("delete_doc", Map::new()).await;
    let unknown_prompt = orchestrator.get_prompt("translate", Map::new()).await;
    let pids = orchestrator.server_pids();

    orchestrator.shutdown().await?;
    orchestrator.shutdown().await?;

    assert_eq!(tools.len(), 2, "duplicate names are shadowed: {tools:?}");
    assert!(tools.iter().all(|tool| tool.owner == "second"));
    assert_eq!(prompts.len(), 2);
    assert_eq!(
        output?.text,
        "The plan outlines the steps for the project's implementation."
    );
    assert_eq!(
        document?,
        "These financials outline the project's budget and expenditures."
    );
    let prompt = prompt?;
    assert_eq!(prompt.len(), 1);
    assert!(prompt[0].text.contains("plan.md"));
    assert!(
        matches!(unknown, Err(OrchestratorError::UnknownTool { ref name }) if name == "delete_doc"),
        "{unknown:?}"
    );
    assert!(
        matches!(unknown_prompt, Err(OrchestratorError::UnknownPrompt { .. })),
        "{unknown_prompt:?}"
    );
    assert_eq!(pids.len(), 2);
    for pid in pids {
        assert!(!process_exists(pid), "server {pid} survived shutdown");
    }
    Ok(())
}

#[tokio::test]
async fn failed_startup_leaves_no_child_process() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let pid_file = temp.path().join("doc.pid");
    let recorded = ServerLaunchConfig::new(
        "recorded",
        "sh",
        [
            "-c".to_string(),
            format!("echo $$ > '{}'; exec '{}' serve", pid_file.display(), BINARY_PATH),
        ],
    );
    let broken = ServerLaunchConfig::new(
        "broken",
        "/nonexistent/mcp-chat-server",
        Vec::<String>::new(),
    );

    let result = Orchestrator::start(vec![recorded, broken], test_settings()).await;

    match result {
        Err(OrchestratorError::StartupFailed { identifier, source }) => {
            assert_eq!(identifier, "broken");
            assert!(matches!(source, ConnectionError::Spawn { .. }), "{source:?}");
        }
        Err(other) => panic!("Unexpected error: {other:?}"),
        Ok(_) => panic!("startup should fail"),
    }
    let pid: u32 = fs::read_to_string(&pid_file)?.trim().parse()?;
    assert!(!process_exists(pid), "server {pid} survived failed startup");
    Ok(())
}

#[tokio::test]
async fn scope_shuts_down_after_the_body() -> Result<()> {
    let pids = Orchestrator::scope(
        vec![doc_server("docs")],
        test_settings(),
        async |orchestrator: &Orchestrator| -> Result<Vec<u32>, OrchestratorError> {
            assert_eq!(orchestrator.server_identifiers(), vec!["docs"]);
            Ok(orchestrator.server_pids())
        },
    )
    .await?;

    assert_eq!(pids.len(), 1);
    assert!(!process_exists(pids[0]));
    Ok(())
}

#[tokio::test]
async fn scope_shuts_down_when_the_body_fails() -> Result<()> {
    let mut seen = Vec::new();
    let result = Orchestrator::scope(
        vec![doc_server("docs")],
        test_settings(),
        async |orchestrator: &Orchestrator| -> Result<(), OrchestratorError> {
            seen = orchestrator.server_pids();
            orchestrator.invoke_tool("missing_tool", Map::new()).await?;
            Ok(())
        },
    )
    .await;

    assert!(matches!(result, Err(OrchestratorError::UnknownTool { .. })));
    assert_eq!(seen.len(), 1);
    assert!(!process_exists(seen[0]));
    Ok(())
}
