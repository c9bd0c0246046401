//! Tool-use loop over the completion service and the orchestrator.
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{
    completion::{CompletionRequest, CompletionService, ContentBlock, Message, Role},
    Agent, AgentError,
};
use crate::{
    client::{MessageRole, Orchestrator, PromptFragment},
    tools::documents::document_uri,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to document tools. \
     Use the tools when a question concerns a document, and answer concisely.";

/// Session-scoped conversational agent. History lives for as long as the
/// agent does.
pub struct ChatAgent<'a> {
    orchestrator: &'a Orchestrator,
    completion: Box<dyn CompletionService>,
    history: Vec<Message>,
    max_tool_rounds: usize,
}

impl<'a> ChatAgent<'a> {
    pub fn new(
        orchestrator: &'a Orchestrator,
        completion: Box<dyn CompletionService>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            orchestrator,
            completion,
            history: Vec::new(),
            max_tool_rounds,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    async fn prepare_turn(&self, query: &str) -> Result<Vec<Message>, AgentError> {
        let trimmed = query.trim();
        if let Some(command) = trimmed.strip_prefix('/') {
            return self.prompt_turn(command).await;
        }
        Ok(vec![Message::user_text(self.with_mentions(trimmed).await)])
    }

    /// `/name arg` runs prompt `name` with `{doc_id: arg}`.
    async fn prompt_turn(&self, command: &str) -> Result<Vec<Message>, AgentError> {
        let mut words = command.split_whitespace();
        let name = words.next().ok_or(AgentError::EmptyCommand)?;
        let mut arguments = Map::new();
        if let Some(doc_id) = words.next() {
            arguments.insert("doc_id".into(), Value::String(doc_id.to_string()));
        }

        let fragments = self.orchestrator.get_prompt(name, arguments).await?;
        info!(
            target: "mcp_chat::agent",
            prompt = name,
            messages = fragments.len(),
            "Expanded prompt command"
        );
        Ok(fragments.into_iter().map(fragment_message).collect())
    }

    /// Attach the text of every `@doc_id` mentioned in `query`.
    async fn with_mentions(&self, query: &str) -> String {
        let mut context = String::new();
        for doc_id in mentions(query) {
            match self.orchestrator.read_resource(&document_uri(doc_id)).await {
                Ok(text) => {
                    context.push_str(&format!("<document id=\"{doc_id}\">\n{text}\n</document>\n"));
                }
                Err(err) => warn!(
                    target: "mcp_chat::agent",
                    doc_id,
                    reason = %err,
                    "Skipping unreadable document mention"
                ),
            }
        }

        if context.is_empty() {
            return query.to_string();
        }
        format!(
            "The user has a question:\n<query>\n{query}\n</query>\n\n\
             The following context may be useful in answering their question:\n\
             <context>\n{context}</context>"
        )
    }

    async fn run_turn(&mut self) -> Result<String, AgentError> {
        let tools: Vec<_> = self
            .orchestrator
            .merged_tools()
            .into_iter()
            .map(|tagged| tagged.item)
            .collect();
        let mut rounds = 0;

        loop {
            let response = self
                .completion
                .complete(&CompletionRequest {
                    system: SYSTEM_PROMPT,
                    messages: &self.history,
                    tools: &tools,
                })
                .await?;

            let content: Vec<ContentBlock> = response
                .content
                .into_iter()
                .filter(|block| !matches!(block, ContentBlock::Unsupported))
                .collect();
            let text = content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            let calls: Vec<(String, String, Value)> = content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();
            self.history.push(Message {
                role: Role::Assistant,
                content,
            });

            if calls.is_empty() {
                return Ok(text);
            }
            if rounds == self.max_tool_rounds {
                return Err(AgentError::ToolRoundsExhausted { rounds });
            }
            rounds += 1;

            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in calls {
                results.push(self.run_tool(id, &name, input).await);
            }
            self.history.push(Message {
                role: Role::User,
                content: results,
            });
        }
    }

    async fn run_tool(&self, tool_use_id: String, name: &str, input: Value) -> ContentBlock {
        let arguments = match input {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        debug!(target: "mcp_chat::agent", tool = name, "Model requested tool");
        match self.orchestrator.invoke_tool(name, arguments).await {
            Ok(output) => ContentBlock::ToolResult {
                tool_use_id,
                content: output.text,
                is_error: output.is_error,
            },
            Err(err) => {
                warn!(
                    target: "mcp_chat::agent",
                    tool = name,
                    reason = %err,
                    "Tool call failed; reporting the error to the model"
                );
                ContentBlock::ToolResult {
                    tool_use_id,
                    content: err.to_string(),
                    is_error: true,
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl Agent for ChatAgent<'_> {
    async fn answer(&mut self, query: &str) -> Result<String, AgentError> {
        let checkpoint = self.history.len();
        let outcome = match self.prepare_turn(query).await {
            Ok(turn) => {
                self.history.extend(turn);
                self.run_turn().await
            }
            Err(err) => Err(err),
        };
        if outcome.is_err() {
            self.history.truncate(checkpoint);
        }
        outcome
    }
}

fn fragment_message(fragment: PromptFragment) -> Message {
    match fragment.role {
        MessageRole::User => Message::user_text(fragment.text),
        MessageRole::Assistant => Message::assistant_text(fragment.text),
    }
}

/// Document ids written as `@id`, trailing punctuation stripped.
pub fn mentions(query: &str) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    for word in query.split_whitespace() {
        let Some(id) = word.strip_prefix('@') else {
            continue;
        };
        let id = id.trim_end_matches(|ch: char| matches!(ch, ',' | ';' | ':' | '?' | '!' | ')'));
        let id = id.strip_suffix('.').unwrap_or(id);
        if !id.is_empty() && !found.contains(&id) {
            found.push(id);
        }
    }
    found
}
