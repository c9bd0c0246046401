//! One live session with an MCP server running as a child process.
use std::{future::Future, process::Stdio, time::Duration};

use rmcp::{
    model::{
        CallToolRequestParam, ClientInfo, ErrorCode, GetPromptRequestParam,
        ReadResourceRequestParam,
    },
    serve_client,
    service::{Peer, RoleClient, RunningService, ServiceError},
};
use serde_json::{Map, Value};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, Command},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

use super::{
    bridge::ChildIoBridge,
    catalog::{
        resource_text, PromptDescriptor, PromptFragment, RegistrySnapshot, ResourceDescriptor,
        ToolDescriptor, ToolOutput,
    },
    errors::ConnectionError,
};
use crate::{
    config::{
        DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_GRACE_SECS,
    },
    lib::errors::{error_kind_of, ErrorKind},
};

/// Timeouts applied to every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub handshake_timeout: Duration,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

/// How to launch one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLaunchConfig {
    pub identifier: String,
    pub command: String,
    pub args: Vec<String>,
}

impl ServerLaunchConfig {
    pub fn new(
        identifier: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace-separated command line. Returns `None` when the
    /// line holds no program name.
    pub fn from_command_line(identifier: impl Into<String>, line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?;
        Some(Self::new(identifier, command, words))
    }
}

type ClientService = RunningService<RoleClient, ClientInfo>;

/// A handshaken session. Closing is explicit through [`ServerConnection::close`];
/// a connection dropped while open kills its child.
pub struct ServerConnection {
    identifier: String,
    child: Child,
    service: Option<ClientService>,
    stderr_task: Option<JoinHandle<()>>,
    settings: ConnectionSettings,
    snapshot: RegistrySnapshot,
}

impl ServerConnection {
    /// Spawn the server, complete the initialize exchange, and fetch its
    /// capability listings.
    pub async fn open(
        launch: &ServerLaunchConfig,
        settings: ConnectionSettings,
    ) -> Result<Self, ConnectionError> {
        let identifier = launch.identifier.clone();
        let mut command = Command::new(&launch.command);
        command
            .args(&launch.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ConnectionError::Spawn {
            identifier: identifier.clone(),
            command: launch.command.clone(),
            source,
        })?;
        debug!(
            target: "mcp_chat::connection",
            server = %identifier,
            pid = child.id(),
            command = %launch.command,
            "Spawned server process"
        );

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| forward_stderr(identifier.clone(), stderr));
        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            abandon(&identifier, &mut child, stderr_task).await;
            return Err(ConnectionError::HandshakeFailed {
                identifier,
                reason: "child process stdio was not captured".into(),
            });
        };

        let bridge = ChildIoBridge::new(stdout, stdin);
        let service = match timeout(
            settings.handshake_timeout,
            serve_client(ClientInfo::default(), bridge),
        )
        .await
        {
            Ok(Ok(service)) => service,
            Ok(Err(err)) => {
                abandon(&identifier, &mut child, stderr_task).await;
                return Err(ConnectionError::HandshakeFailed {
                    identifier,
                    reason: err.to_string(),
                });
            }
            Err(_) => {
                abandon(&identifier, &mut child, stderr_task).await;
                return Err(ConnectionError::HandshakeFailed {
                    identifier,
                    reason: format!(
                        "no initialize response within {}s",
                        settings.handshake_timeout.as_secs()
                    ),
                });
            }
        };

        let mut connection = Self {
            identifier,
            child,
            service: Some(service),
            stderr_task,
            settings,
            snapshot: RegistrySnapshot::default(),
        };

        match connection.fetch_snapshot().await {
            Ok(snapshot) => connection.snapshot = snapshot,
            Err(err) => {
                let identifier = connection.identifier.clone();
                if let Err(close_err) = connection.close().await {
                    warn!(
                        target: "mcp_chat::connection",
                        server = %identifier,
                        reason = %close_err,
                        "Failed to close server after listing failure"
                    );
                }
                return Err(ConnectionError::HandshakeFailed {
                    identifier,
                    reason: format!("capability listing failed: {err}"),
                });
            }
        }

        info!(
            target: "mcp_chat::connection",
            server = %connection.identifier,
            tools = connection.snapshot.tools.len(),
            resources = connection.snapshot.resources.len(),
            prompts = connection.snapshot.prompts.len(),
            "Server connection established"
        );
        Ok(connection)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Process id of the child, while it has not been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn is_open(&self) -> bool {
        self.service.is_some()
    }

    /// Listings captured right after the handshake.
    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ConnectionError> {
        let service = self.service()?;
        if !self.advertises(|caps| caps.tools.is_some()) {
            return Ok(Vec::new());
        }
        let tools = self.request("tools/list", service.list_all_tools()).await?;
        Ok(tools.iter().map(ToolDescriptor::from).collect())
    }

    /// Concrete resources followed by resource templates.
    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, ConnectionError> {
        let service = self.service()?;
        if !self.advertises(|caps| caps.resources.is_some()) {
            return Ok(Vec::new());
        }
        list_resources_on(&self.requester(), service).await
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, ConnectionError> {
        let service = self.service()?;
        if !self.advertises(|caps| caps.prompts.is_some()) {
            return Ok(Vec::new());
        }
        let prompts = self
            .request("prompts/list", service.list_all_prompts())
            .await?;
        Ok(prompts.iter().map(PromptDescriptor::from).collect())
    }

    /// Invoke a tool. A result the server flags as an error is returned as
    /// [`ToolOutput`] with `is_error` set, not as `Err`.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ConnectionError> {
        let service = self.service()?;
        let result = self
            .request(
                "tools/call",
                service.call_tool(CallToolRequestParam {
                    name: name.to_string().into(),
                    arguments: Some(arguments),
                }),
            )
            .await?;
        Ok(ToolOutput::from(&result))
    }

    pub async fn read_resource(&self, uri: &str) -> Result<String, ConnectionError> {
        let service = self.service()?;
        let result = self
            .request(
                "resources/read",
                service.read_resource(ReadResourceRequestParam {
                    uri: uri.to_string(),
                }),
            )
            .await?;
        Ok(resource_text(&result))
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<PromptFragment>, ConnectionError> {
        let service = self.service()?;
        let result = self
            .request(
                "prompts/get",
                service.get_prompt(GetPromptRequestParam {
                    name: name.to_string(),
                    arguments: Some(arguments),
                }),
            )
            .await?;
        Ok(result.messages.iter().map(PromptFragment::from).collect())
    }

    /// End the session: close the server's stdin, wait up to the grace
    /// period, then kill. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        let Some(service) = self.service.take() else {
            return Ok(());
        };

        if let Err(err) = service.cancel().await {
            warn!(
                target: "mcp_chat::connection",
                server = %self.identifier,
                reason = %err,
                "Client session task ended abnormally"
            );
        }

        let outcome = match timeout(self.settings.shutdown_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(
                    target: "mcp_chat::connection",
                    server = %self.identifier,
                    status = %status,
                    "Server process exited"
                );
                Ok(())
            }
            Ok(Err(source)) => Err(ConnectionError::Shutdown {
                identifier: self.identifier.clone(),
                source,
            }),
            Err(_) => {
                warn!(
                    target: "mcp_chat::connection",
                    server = %self.identifier,
                    grace_ms = self.settings.shutdown_grace.as_millis(),
                    "Server did not exit within the grace period; killing it"
                );
                self.child
                    .kill()
                    .await
                    .map_err(|source| ConnectionError::Shutdown {
                        identifier: self.identifier.clone(),
                        source,
                    })
            }
        };

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        outcome
    }

    async fn fetch_snapshot(&self) -> Result<RegistrySnapshot, ConnectionError> {
        Ok(RegistrySnapshot {
            tools: self.list_tools().await?,
            resources: self.list_resources().await?,
            prompts: self.list_prompts().await?,
        })
    }

    fn service(&self) -> Result<&ClientService, ConnectionError> {
        self.service
            .as_ref()
            .ok_or_else(|| ConnectionError::ConnectionLost {
                identifier: self.identifier.clone(),
                reason: "connection is closed".into(),
            })
    }

    fn advertises(&self, check: impl Fn(&rmcp::model::ServerCapabilities) -> bool) -> bool {
        self.service
            .as_ref()
            .and_then(|service| service.peer_info())
            .map(|info| check(&info.capabilities))
            .unwrap_or(false)
    }

    fn requester(&self) -> Requester<'_> {
        Requester {
            identifier: &self.identifier,
            request_timeout: self.settings.request_timeout,
        }
    }

    async fn request<T>(
        &self,
        method: &'static str,
        call: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ConnectionError> {
        self.requester().request(method, call).await
    }
}

/// Timeout and error classification for requests on one connection.
struct Requester<'a> {
    identifier: &'a str,
    request_timeout: Duration,
}

impl Requester<'_> {
    async fn request<T>(
        &self,
        method: &'static str,
        call: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ConnectionError> {
        match timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.classify(method, err)),
            Err(_) => Err(ConnectionError::ConnectionLost {
                identifier: self.identifier.to_string(),
                reason: format!(
                    "{method} timed out after {}s",
                    self.request_timeout.as_secs()
                ),
            }),
        }
    }

    fn classify(&self, method: &'static str, err: ServiceError) -> ConnectionError {
        let identifier = self.identifier.to_string();
        match err {
            ServiceError::McpError(data) => {
                let message = data.message.to_string();
                match error_kind_of(&data).or_else(|| kind_from_code(data.code)) {
                    Some(ErrorKind::NotFound) => ConnectionError::NotFound {
                        identifier,
                        message,
                    },
                    Some(ErrorKind::InvalidArgument) => ConnectionError::InvalidArgument {
                        identifier,
                        message,
                    },
                    None => ConnectionError::Remote {
                        identifier,
                        code: data.code.0,
                        message,
                    },
                }
            }
            other => ConnectionError::ConnectionLost {
                identifier,
                reason: format!("{method}: {other}"),
            },
        }
    }
}

/// Servers that advertise resources without a template handler answer
/// `resources/templates/list` with method-not-found; that reads as no templates.
async fn list_resources_on(
    requester: &Requester<'_>,
    peer: &Peer<RoleClient>,
) -> Result<Vec<ResourceDescriptor>, ConnectionError> {
    let resources = requester
        .request("resources/list", peer.list_all_resources())
        .await?;
    let templates = match requester
        .request(
            "resources/templates/list",
            peer.list_all_resource_templates(),
        )
        .await
    {
        Ok(templates) => templates,
        Err(ConnectionError::NotFound { message, .. }) => {
            debug!(
                target: "mcp_chat::connection",
                server = %requester.identifier,
                reason = %message,
                "Server has no resource templates"
            );
            Vec::new()
        }
        Err(err) => return Err(err),
    };
    Ok(resources
        .iter()
        .map(ResourceDescriptor::from)
        .chain(templates.iter().map(ResourceDescriptor::from))
        .collect())
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        if self.service.is_some() {
            warn!(
                target: "mcp_chat::connection",
                server = %self.identifier,
                "Connection dropped without close; killing server process"
            );
            let _ = self.child.start_kill();
        }
    }
}

fn kind_from_code(code: ErrorCode) -> Option<ErrorKind> {
    if code == ErrorCode::RESOURCE_NOT_FOUND || code == ErrorCode::METHOD_NOT_FOUND {
        Some(ErrorKind::NotFound)
    } else if code == ErrorCode::INVALID_PARAMS {
        Some(ErrorKind::InvalidArgument)
    } else {
        None
    }
}

fn forward_stderr(identifier: String, stderr: ChildStderr) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "mcp_chat::connection", server = %identifier, "{line}");
        }
    })
}

async fn abandon(identifier: &str, child: &mut Child, stderr_task: Option<JoinHandle<()>>) {
    if let Err(err) = child.kill().await {
        warn!(
            target: "mcp_chat::connection",
            server = %identifier,
            reason = %err,
            "Failed to kill server process"
        );
    }
    if let Some(task) = stderr_task {
        task.abort();
    }
}
