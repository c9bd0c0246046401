//! Owns every server connection and routes calls by capability name.
use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{
    catalog::{
        template_matches, PromptDescriptor, PromptFragment, ResourceDescriptor, Tagged,
        ToolDescriptor, ToolOutput,
    },
    connection::{ConnectionSettings, ServerConnection, ServerLaunchConfig},
    errors::{OrchestratorError, ShutdownFailure},
};

/// Capability name to index of the owning connection. A later connection
/// that registers the same name takes it over.
#[derive(Debug, Default)]
pub struct CapabilityNamespace {
    tools: HashMap<String, usize>,
    resources: HashMap<String, usize>,
    prompts: HashMap<String, usize>,
}

impl CapabilityNamespace {
    fn build(connections: &[ServerConnection]) -> Self {
        let mut namespace = Self::default();
        for (index, connection) in connections.iter().enumerate() {
            let snapshot = connection.snapshot();
            for tool in &snapshot.tools {
                namespace.claim(connections, Kind::Tool, &tool.name, index);
            }
            for resource in &snapshot.resources {
                namespace.claim(connections, Kind::Resource, &resource.uri_template, index);
            }
            for prompt in &snapshot.prompts {
                namespace.claim(connections, Kind::Prompt, &prompt.name, index);
            }
        }
        namespace
    }

    fn claim(&mut self, connections: &[ServerConnection], kind: Kind, name: &str, index: usize) {
        let map = match kind {
            Kind::Tool => &mut self.tools,
            Kind::Resource => &mut self.resources,
            Kind::Prompt => &mut self.prompts,
        };
        if let Some(previous) = map.insert(name.to_string(), index) {
            if previous != index {
                warn!(
                    target: "mcp_chat::orchestrator",
                    kind = kind.as_str(),
                    name,
                    shadowed = connections[previous].identifier(),
                    owner = connections[index].identifier(),
                    "Capability name registered by more than one server; the later server wins"
                );
            }
        }
    }

    pub fn tool_owner(&self, name: &str) -> Option<usize> {
        self.tools.get(name).copied()
    }

    pub fn prompt_owner(&self, name: &str) -> Option<usize> {
        self.prompts.get(name).copied()
    }

    /// Exact uri first, then the latest-registered template that matches.
    pub fn resource_owner(&self, uri: &str) -> Option<usize> {
        if let Some(&index) = self.resources.get(uri) {
            return Some(index);
        }
        self.resources
            .iter()
            .filter(|(template, _)| template_matches(template, uri))
            .map(|(_, &index)| index)
            .max()
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Tool,
    Resource,
    Prompt,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Tool => "tool",
            Kind::Resource => "resource",
            Kind::Prompt => "prompt",
        }
    }
}

pub struct Orchestrator {
    connections: Vec<ServerConnection>,
    namespace: CapabilityNamespace,
    shut_down: bool,
}

impl Orchestrator {
    /// Open every configured connection in order. If one fails, the
    /// connections already opened are closed before the error is returned.
    pub async fn start(
        configs: Vec<ServerLaunchConfig>,
        settings: ConnectionSettings,
    ) -> Result<Self, OrchestratorError> {
        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.identifier.as_str()) {
                return Err(OrchestratorError::DuplicateIdentifier {
                    identifier: config.identifier.clone(),
                });
            }
        }

        let mut connections: Vec<ServerConnection> = Vec::with_capacity(configs.len());
        for config in configs {
            match ServerConnection::open(&config, settings.clone()).await {
                Ok(connection) => connections.push(connection),
                Err(source) => {
                    warn!(
                        target: "mcp_chat::orchestrator",
                        server = %config.identifier,
                        reason = %source,
                        opened = connections.len(),
                        "Server failed to start; closing servers already opened"
                    );
                    for failure in close_all(&mut connections).await {
                        warn!(
                            target: "mcp_chat::orchestrator",
                            server = %failure.identifier,
                            reason = %failure.source,
                            "Failed to close server during startup rollback"
                        );
                    }
                    return Err(OrchestratorError::StartupFailed {
                        identifier: config.identifier,
                        source,
                    });
                }
            }
        }

        let namespace = CapabilityNamespace::build(&connections);
        info!(
            target: "mcp_chat::orchestrator",
            servers = connections.len(),
            tools = namespace.tools.len(),
            resources = namespace.resources.len(),
            prompts = namespace.prompts.len(),
            "All servers connected"
        );
        Ok(Self {
            connections,
            namespace,
            shut_down: false,
        })
    }

    /// Start, run `body`, then shut down whatever `body` returned. Shutdown
    /// failures are logged; the body's result is what the caller sees.
    pub async fn scope<T, E, F>(
        configs: Vec<ServerLaunchConfig>,
        settings: ConnectionSettings,
        body: F,
    ) -> Result<T, E>
    where
        F: AsyncFnOnce(&Orchestrator) -> Result<T, E>,
        E: From<OrchestratorError>,
    {
        let mut orchestrator = Self::start(configs, settings).await?;
        let outcome = body(&orchestrator).await;
        if let Err(err) = orchestrator.shutdown().await {
            warn!(
                target: "mcp_chat::orchestrator",
                reason = %err,
                "Shutdown finished with failures"
            );
        }
        outcome
    }

    pub fn server_identifiers(&self) -> Vec<&str> {
        self.connections
            .iter()
            .map(ServerConnection::identifier)
            .collect()
    }

    /// Child process ids of connections that have not been reaped.
    pub fn server_pids(&self) -> Vec<u32> {
        self.connections
            .iter()
            .filter_map(ServerConnection::pid)
            .collect()
    }

    /// Tools visible after shadowing, in connection order.
    pub fn merged_tools(&self) -> Vec<Tagged<ToolDescriptor>> {
        self.merged(
            |connection| &connection.snapshot().tools,
            |tool| self.namespace.tool_owner(&tool.name),
        )
    }

    pub fn merged_resources(&self) -> Vec<Tagged<ResourceDescriptor>> {
        self.merged(
            |connection| &connection.snapshot().resources,
            |resource| self.namespace.resources.get(&resource.uri_template).copied(),
        )
    }

    pub fn merged_prompts(&self) -> Vec<Tagged<PromptDescriptor>> {
        self.merged(
            |connection| &connection.snapshot().prompts,
            |prompt| self.namespace.prompt_owner(&prompt.name),
        )
    }

    fn merged<T: Clone>(
        &self,
        items: impl Fn(&ServerConnection) -> &Vec<T>,
        owner_of: impl Fn(&T) -> Option<usize>,
    ) -> Vec<Tagged<T>> {
        let mut merged = Vec::new();
        for (index, connection) in self.connections.iter().enumerate() {
            for item in items(connection) {
                if owner_of(item) == Some(index) {
                    merged.push(Tagged {
                        owner: connection.identifier().to_string(),
                        item: item.clone(),
                    });
                }
            }
        }
        merged
    }

    pub async fn invoke_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, OrchestratorError> {
        let connection = self
            .namespace
            .tool_owner(name)
            .and_then(|index| self.connections.get(index))
            .ok_or_else(|| OrchestratorError::UnknownTool {
                name: name.to_string(),
            })?;
        info!(
            target: "mcp_chat::orchestrator",
            tool = name,
            server = connection.identifier(),
            "Routing tool call"
        );
        connection
            .call_tool(name, arguments)
            .await
            .map_err(|source| OrchestratorError::Connection {
                identifier: connection.identifier().to_string(),
                source,
            })
    }

    pub async fn read_resource(&self, uri: &str) -> Result<String, OrchestratorError> {
        let connection = self
            .namespace
            .resource_owner(uri)
            .and_then(|index| self.connections.get(index))
            .ok_or_else(|| OrchestratorError::UnknownResource {
                uri: uri.to_string(),
            })?;
        connection
            .read_resource(uri)
            .await
            .map_err(|source| OrchestratorError::Connection {
                identifier: connection.identifier().to_string(),
                source,
            })
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<PromptFragment>, OrchestratorError> {
        let connection = self
            .namespace
            .prompt_owner(name)
            .and_then(|index| self.connections.get(index))
            .ok_or_else(|| OrchestratorError::UnknownPrompt {
                name: name.to_string(),
            })?;
        connection
            .get_prompt(name, arguments)
            .await
            .map_err(|source| OrchestratorError::Connection {
                identifier: connection.identifier().to_string(),
                source,
            })
    }

    /// Close every connection. Failures are collected rather than stopping
    /// the sweep. Calling this again is a no-op.
    pub async fn shutdown(&mut self) -> Result<(), OrchestratorError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let failures = close_all(&mut self.connections).await;
        info!(
            target: "mcp_chat::orchestrator",
            servers = self.connections.len(),
            failures = failures.len(),
            "Orchestrator shut down"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(OrchestratorError::ShutdownFailed { failures })
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.shut_down && !self.connections.is_empty() {
            warn!(
                target: "mcp_chat::orchestrator",
                servers = self.connections.len(),
                "Orchestrator dropped without shutdown; server processes will be killed"
            );
        }
    }
}

async fn close_all(connections: &mut [ServerConnection]) -> Vec<ShutdownFailure> {
    let mut failures = Vec::new();
    for connection in connections.iter_mut().rev() {
        if let Err(source) = connection.close().await {
            failures.push(ShutdownFailure {
                identifier: connection.identifier().to_string(),
                source,
            });
        }
    }
    failures
}
