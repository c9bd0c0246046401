//! Anthropic Messages API client and the wire types of a conversation.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{client::ToolDescriptor, config::CompletionSection};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service unavailable: {reason}")]
    RemoteServiceUnavailable { reason: String },
}

impl CompletionError {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self::RemoteServiceUnavailable {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types this client does not act on.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// One turn sent to the model: the system prompt, the history, and the
/// tools it may call.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDescriptor],
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<CompletionResponse, CompletionError>;
}

pub struct AnthropicService {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDescriptor],
}

fn no_tools(tools: &&[ToolDescriptor]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl AnthropicService {
    pub fn new(section: &CompletionSection) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(section.timeout)
            .build()
            .map_err(|err| CompletionError::unavailable(err.to_string()))?;
        Ok(Self {
            client,
            api_key: section.api_key.clone(),
            model: section.model.clone(),
            endpoint: section.endpoint.clone(),
            max_tokens: section.max_tokens,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint)
    }
}

#[async_trait]
impl CompletionService for AnthropicService {
    #[instrument(
        skip(self, request),
        fields(model = %self.model, messages = request.messages.len())
    )]
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<CompletionResponse, CompletionError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: request.system,
            messages: request.messages,
            tools: request.tools,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| CompletionError::unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<AnthropicError>().await {
                Ok(error) => error.error.message,
                Err(_) => "no error detail".to_string(),
            };
            return Err(CompletionError::unavailable(format!("HTTP {status}: {detail}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::unavailable(format!("undecodable response: {err}")))?;
        debug!(
            target: "mcp_chat::agent",
            blocks = completion.content.len(),
            stop_reason = completion.stop_reason.as_deref().unwrap_or("none"),
            "Completion received"
        );
        Ok(completion)
    }
}
