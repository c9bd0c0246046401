use anyhow::Result;
use rmcp::{
    model::{
        CallToolRequestParam, ClientInfo, ErrorCode, GetPromptRequestParam, PromptMessageContent,
        PromptMessageRole, ReadResourceRequestParam, ResourceContents,
    },
    serve_client,
    service::{RoleClient, RunningService, ServiceError},
    ServiceExt,
};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

use mcp_chat::{
    lib::errors::{error_kind_of, ErrorKind},
    server::runtime::{build_instructions, DocumentServer},
    tools::documents::DocumentStore,
};

type Client = RunningService<RoleClient, ClientInfo>;

async fn connect() -> Result<(Client, JoinHandle<Result<()>>)> {
    let store = DocumentStore::seeded();
    let server = DocumentServer::new(store.clone(), build_instructions(store.len().await));
    let (server_transport, client_transport) = tokio::io::duplex(4096);

    let server_task = tokio::spawn(async move {
        server.serve(server_transport).await?.waiting().await?;
        Result::<_, anyhow::Error>::Ok(())
    });
    let client = serve_client(ClientInfo::default(), client_transport).await?;
    Ok((client, server_task))
}

async fn disconnect(client: Client, server_task: JoinHandle<Result<()>>) {
    let _ = client.cancel().await;
    let _ = server_task.await;
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().expect("JSON object").clone()
}

fn first_text(result: &rmcp::model::CallToolResult) -> String {
    result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.clone())
        .expect("text content")
}

fn resource_text(result: &rmcp::model::ReadResourceResult) -> String {
    match result.contents.first().expect("one content entry") {
        ResourceContents::TextResourceContents { text, .. } => text.clone(),
        other => panic!("expected text contents, got {other:?}"),
    }
}

fn expect_mcp_error(result: Result<impl std::fmt::Debug, ServiceError>) -> rmcp::model::ErrorData {
    match result.expect_err("call should fail") {
        ServiceError::McpError(data) => data,
        other => panic!("expected an MCP error, got {other:?}"),
    }
}

#[tokio::test]
async fn edit_replaces_first_occurrence_only() -> Result<()> {
    let (client, server_task) = connect().await?;

    let edited = client
        .call_tool(CallToolRequestParam {
            name: "edit_doc".into(),
            arguments: Some(args(json!({
                "doc_id": "plan.md",
                "old_text": "the",
                "new_text": "THE"
            }))),
        })
        .await;
    let read = client
        .call_tool(CallToolRequestParam {
            name: "read_doc".into(),
            arguments: Some(args(json!({ "doc_id": "plan.md" }))),
        })
        .await;
    disconnect(client, server_task).await;

    let expected = "The plan outlines THE steps for the project's implementation.";
    assert_eq!(first_text(&edited?), expected);
    assert_eq!(first_text(&read?), expected);
    Ok(())
}

#[tokio::test]
async fn edit_with_absent_text_is_invalid_argument_and_leaves_document() -> Result<()> {
    let (client, server_task) = connect().await?;

    let edited = client
        .call_tool(CallToolRequestParam {
            name: "edit_doc".into(),
            arguments: Some(args(json!({
                "doc_id": "report.pdf",
                "old_text": "skyscraper",
                "new_text": "shed"
            }))),
        })
        .await;
    let read = client
        .call_tool(CallToolRequestParam {
            name: "read_doc".into(),
            arguments: Some(args(json!({ "doc_id": "report.pdf" }))),
        })
        .await;
    disconnect(client, server_task).await;

    let error = expect_mcp_error(edited);
    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    assert_eq!(error_kind_of(&error), Some(ErrorKind::InvalidArgument));
    assert_eq!(
        first_text(&read?),
        "The report details the state of a 20m condenser tower."
    );
    Ok(())
}

#[tokio::test]
async fn unknown_document_is_invalid_argument() -> Result<()> {
    let (client, server_task) = connect().await?;

    let result = client
        .call_tool(CallToolRequestParam {
            name: "read_doc".into(),
            arguments: Some(args(json!({ "doc_id": "missing.md" }))),
        })
        .await;
    disconnect(client, server_task).await;

    let error = expect_mcp_error(result);
    assert_eq!(error_kind_of(&error), Some(ErrorKind::InvalidArgument));
    Ok(())
}

#[tokio::test]
async fn unknown_tool_is_rejected_without_crashing_the_server() -> Result<()> {
    let (client, server_task) = connect().await?;

    let unknown = client
        .call_tool(CallToolRequestParam {
            name: "delete_doc".into(),
            arguments: Some(Map::new()),
        })
        .await;
    let unknown_prompt = client
        .get_prompt(GetPromptRequestParam {
            name: "translate".into(),
            arguments: Some(args(json!({ "doc_id": "plan.md" }))),
        })
        .await;
    let still_alive = client.list_tools(None).await;
    disconnect(client, server_task).await;

    let error = expect_mcp_error(unknown);
    assert_eq!(error.code, ErrorCode::RESOURCE_NOT_FOUND);
    assert_eq!(error_kind_of(&error), Some(ErrorKind::NotFound));
    let error = expect_mcp_error(unknown_prompt);
    assert_eq!(error_kind_of(&error), Some(ErrorKind::NotFound));
    assert_eq!(still_alive?.tools.len(), 2);
    Ok(())
}

#[tokio::test]
async fn resources_list_and_read_documents() -> Result<()> {
    let (client, server_task) = connect().await?;

    let resources = client.list_all_resources().await;
    let templates = client.list_all_resource_templates().await;
    let index = client
        .read_resource(ReadResourceRequestParam {
            uri: "docs://documents".into(),
        })
        .await;
    let document = client
        .read_resource(ReadResourceRequestParam {
            uri: "docs://documents/spec.txt".into(),
        })
        .await;
    let missing = client
        .read_resource(ReadResourceRequestParam {
            uri: "docs://documents/missing.md".into(),
        })
        .await;
    disconnect(client, server_task).await;

    assert!(resources?
        .iter()
        .any(|resource| resource.uri == "docs://documents"));
    assert!(templates?
        .iter()
        .any(|template| template.uri_template == "docs://documents/{doc_id}"));

    let ids: Vec<String> = serde_json::from_str(&resource_text(&index?))?;
    assert_eq!(ids.len(), 6);
    assert!(ids.contains(&"deposition.md".to_string()));
    assert_eq!(
        resource_text(&document?),
        "These specifications define the technical requirements for the equipment."
    );

    let error = expect_mcp_error(missing);
    assert_eq!(error.code, ErrorCode::RESOURCE_NOT_FOUND);
    assert_eq!(error_kind_of(&error), Some(ErrorKind::NotFound));
    Ok(())
}

#[tokio::test]
async fn prompts_render_document_into_a_user_message() -> Result<()> {
    let (client, server_task) = connect().await?;

    let prompts = client.list_all_prompts().await;
    let summary = client
        .get_prompt(GetPromptRequestParam {
            name: "summarize".into(),
            arguments: Some(args(json!({ "doc_id": "outlook.pdf" }))),
        })
        .await;
    let missing = client
        .get_prompt(GetPromptRequestParam {
            name: "format".into(),
            arguments: Some(args(json!({ "doc_id": "missing.md" }))),
        })
        .await;
    disconnect(client, server_task).await;

    let names: Vec<_> = prompts?.into_iter().map(|prompt| prompt.name).collect();
    assert!(names.contains(&"format".to_string()), "{names:?}");
    assert!(names.contains(&"summarize".to_string()), "{names:?}");

    let summary = summary?;
    assert_eq!(summary.messages.len(), 1);
    assert_eq!(summary.messages[0].role, PromptMessageRole::User);
    match &summary.messages[0].content {
        PromptMessageContent::Text { text } => assert!(
            text.contains("projected future performance"),
            "prompt should embed the document: {text}"
        ),
        other => panic!("expected text prompt content, got {other:?}"),
    }

    let error = expect_mcp_error(missing);
    assert_eq!(error_kind_of(&error), Some(ErrorKind::InvalidArgument));
    Ok(())
}
