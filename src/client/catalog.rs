//! Client-side descriptors for what a server exposes, decoupled from the
//! rmcp wire types.
use rmcp::model::{
    CallToolResult, Prompt, PromptMessage, PromptMessageContent, PromptMessageRole,
    ReadResourceResult, Resource, ResourceContents, ResourceTemplate, Tool,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<&Tool> for ToolDescriptor {
    fn from(tool: &Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.as_deref().unwrap_or_default().to_string(),
            input_schema: Value::Object((*tool.input_schema).clone()),
        }
    }
}

/// A concrete resource uri or a template such as `docs://documents/{doc_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub uri_template: String,
    pub name: String,
    pub mime_type: Option<String>,
}

impl From<&Resource> for ResourceDescriptor {
    fn from(resource: &Resource) -> Self {
        Self {
            uri_template: resource.uri.clone(),
            name: resource.name.clone(),
            mime_type: resource.mime_type.clone(),
        }
    }
}

impl From<&ResourceTemplate> for ResourceDescriptor {
    fn from(template: &ResourceTemplate) -> Self {
        Self {
            uri_template: template.uri_template.clone(),
            name: template.name.clone(),
            mime_type: template.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptParameter {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<PromptParameter>,
}

impl From<&Prompt> for PromptDescriptor {
    fn from(prompt: &Prompt) -> Self {
        let parameters = prompt
            .arguments
            .iter()
            .flatten()
            .map(|argument| PromptParameter {
                name: argument.name.clone(),
                description: argument.description.clone(),
                required: argument.required.unwrap_or(false),
            })
            .collect();
        Self {
            name: prompt.name.clone(),
            description: prompt.description.clone().unwrap_or_default(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One role-tagged message produced by a prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptFragment {
    pub role: MessageRole,
    pub text: String,
}

impl From<&PromptMessage> for PromptFragment {
    fn from(message: &PromptMessage) -> Self {
        let role = match message.role {
            PromptMessageRole::User => MessageRole::User,
            PromptMessageRole::Assistant => MessageRole::Assistant,
        };
        let text = match &message.content {
            PromptMessageContent::Text { text } => text.clone(),
            _ => "[non-text prompt content omitted]".to_string(),
        };
        Self { role, text }
    }
}

/// Text returned by a tool call, plus the server's error flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl From<&CallToolResult> for ToolOutput {
    fn from(result: &CallToolResult) -> Self {
        let mut text = result
            .content
            .iter()
            .filter_map(|content| content.as_text().map(|text| text.text.clone()))
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            if let Some(structured) = &result.structured_content {
                text = structured.to_string();
            }
        }
        Self {
            text,
            is_error: result.is_error.unwrap_or(false),
        }
    }
}

/// Concatenate the text parts of a resource read; binary parts are skipped.
pub fn resource_text(result: &ReadResourceResult) -> String {
    result
        .contents
        .iter()
        .filter_map(|contents| match contents {
            ResourceContents::TextResourceContents { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Capabilities fetched once from a server right after the handshake.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub tools: Vec<ToolDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
}

/// An entry of a merged listing, tagged with the connection that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub owner: String,
    pub item: T,
}

/// Match `uri` against a template holding at most one `{variable}`. The
/// variable matches one non-empty path segment.
pub fn template_matches(template: &str, uri: &str) -> bool {
    let Some((prefix, rest)) = template.split_once('{') else {
        return template == uri;
    };
    let Some((_, suffix)) = rest.split_once('}') else {
        return template == uri;
    };
    let Some(middle) = uri
        .strip_prefix(prefix)
        .and_then(|tail| tail.strip_suffix(suffix))
    else {
        return false;
    };
    !middle.is_empty() && !middle.contains('/')
}
