#[path = "integration/common.rs"]
mod common;

#[path = "integration/runtime_spawn.rs"]
mod runtime_spawn;

#[path = "integration/document_server.rs"]
mod document_server;

#[path = "integration/orchestrator.rs"]
mod orchestrator;

#[path = "integration/once_mode.rs"]
mod once_mode;
