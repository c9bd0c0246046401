use std::sync::Arc;

use rmcp::{
    handler::server::{
        prompt::PromptContext, tool::ToolCallContext, wrapper::Parameters, ServerHandler,
    },
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, Content, ErrorData,
        GetPromptRequestParam, GetPromptResult, ListPromptsResult, ListResourceTemplatesResult,
        ListResourcesResult, ListToolsResult, PaginatedRequestParam, PromptMessage,
        PromptMessageRole, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
        ResourceContents, ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    prompt, prompt_router,
    service::RequestContext,
    tool, tool_router, RoleServer,
};
use serde_json::json;

use crate::tools::{
    self,
    documents::{
        self, DocPromptArgs, DocumentResource, DocumentStore, EditDocRequest, ReadDocRequest,
        DOCUMENTS_URI, DOCUMENT_URI_TEMPLATE,
    },
    ServerPromptRouter, ServerToolRouter,
};

/// Capability registry for the document server: tools, resources and
/// prompts all operate on the same private [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentServer {
    store: DocumentStore,
    instructions: Arc<String>,
    tool_router: ServerToolRouter<Self>,
    prompt_router: ServerPromptRouter<Self>,
}

impl DocumentServer {
    pub fn new(store: DocumentStore, instructions: String) -> Self {
        Self {
            store,
            instructions: Arc::new(instructions),
            tool_router: tools::build_router(Self::tool_router),
            prompt_router: tools::build_prompt_router(Self::prompt_router),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_router.list_all().len()
    }

    async fn prompt_messages(
        &self,
        args: DocPromptArgs,
        render: fn(&str, &str) -> String,
        description: String,
    ) -> Result<GetPromptResult, ErrorData> {
        args.validate()
            .map_err(documents::validation_error_to_error_data)?;
        let content = self
            .store
            .read(&args.doc_id)
            .await
            .map_err(documents::document_error_to_error_data)?;
        Ok(GetPromptResult {
            description: Some(description),
            messages: vec![PromptMessage::new_text(
                PromptMessageRole::User,
                render(&args.doc_id, &content),
            )],
        })
    }
}

#[tool_router(router = tool_router)]
impl DocumentServer {
    #[tool(
        name = "read_doc",
        description = "Read the contents of a document and return it as a string."
    )]
    async fn read_doc(
        &self,
        Parameters(request): Parameters<ReadDocRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        request
            .validate()
            .map_err(documents::validation_error_to_error_data)?;
        let content = self
            .store
            .read(&request.doc_id)
            .await
            .map_err(documents::document_error_to_error_data)?;
        Ok(CallToolResult::success(vec![Content::text(content)]))
    }

    #[tool(
        name = "edit_doc",
        description = "Edit a document by replacing the first occurrence of old_text with new_text. Returns the updated document."
    )]
    async fn edit_doc(
        &self,
        Parameters(request): Parameters<EditDocRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        request
            .validate()
            .map_err(documents::validation_error_to_error_data)?;
        let updated = self
            .store
            .edit(&request.doc_id, &request.old_text, &request.new_text)
            .await
            .map_err(documents::document_error_to_error_data)?;
        tracing::info!(
            target: "mcp_chat::runtime",
            doc_id = %request.doc_id,
            "Edited document"
        );
        Ok(CallToolResult::success(vec![Content::text(updated)]))
    }
}

#[prompt_router]
impl DocumentServer {
    #[prompt(name = "format", description = "Rewrite a document in clean Markdown.")]
    async fn format_doc(
        &self,
        Parameters(args): Parameters<DocPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        let description = format!("Rewrite {} as Markdown", args.doc_id);
        self.prompt_messages(args, documents::format_prompt_text, description)
            .await
    }

    #[prompt(name = "summarize", description = "Summarize a document in a few sentences.")]
    async fn summarize_doc(
        &self,
        Parameters(args): Parameters<DocPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        let description = format!("Summarize {}", args.doc_id);
        self.prompt_messages(args, documents::summarize_prompt_text, description)
            .await
    }
}

// Unknown names are answered here so they carry a not_found kind; the routers
// alone would report them as invalid params.
impl ServerHandler for DocumentServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            instructions: Some((*self.instructions).clone()),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if !self.tool_router.has_route(&request.name) {
            return Err(documents::unknown_tool(&request.name));
        }
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(ListPromptsResult::with_all_items(self.prompt_router.list_all()))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        if !self.prompt_router.has_route(&request.name) {
            return Err(documents::unknown_prompt(&request.name));
        }
        self.prompt_router
            .get_prompt(PromptContext::new(
                self,
                request.name,
                request.arguments,
                context,
            ))
            .await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(vec![index_resource()]))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult::with_all_items(vec![
            document_template()?,
        ]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = request.uri;
        let text = match documents::parse_document_uri(&uri) {
            Some(DocumentResource::Index) => {
                let ids = self.store.ids().await;
                serde_json::to_string(&ids)
                    .map_err(|err| ErrorData::internal_error(err.to_string(), None))?
            }
            Some(DocumentResource::Document(doc_id)) => self
                .store
                .read(&doc_id)
                .await
                .map_err(|_| documents::resource_not_found(&uri))?,
            None => return Err(documents::resource_not_found(&uri)),
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

fn index_resource() -> Resource {
    let mut raw = RawResource::new(DOCUMENTS_URI, "documents");
    raw.description = Some("JSON array of every document id".into());
    raw.mime_type = Some("application/json".into());
    raw.no_annotation()
}

// Built through serde so the optional descriptor fields keep their defaults.
fn document_template() -> Result<ResourceTemplate, ErrorData> {
    serde_json::from_value(json!({
        "uriTemplate": DOCUMENT_URI_TEMPLATE,
        "name": "document",
        "description": "Plain-text contents of one document",
        "mimeType": "text/plain"
    }))
    .map_err(|err| ErrorData::internal_error(err.to_string(), None))
}
