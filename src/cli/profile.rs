//! LaunchProfile plus config-path, override, and server-list resolution.
use std::{env, path::PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::{
    client::ServerLaunchConfig,
    config::{CompletionOverrides, ConfigSource, CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH},
};

pub const MODEL_ENV: &str = "CLAUDE_MODEL";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
/// Identifier of the built-in document server.
pub const DOC_SERVER_ID: &str = "doc_client";
const SERVE_SUBCOMMAND: &str = "serve";

/// Resolved chat-mode launch profile.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    pub once: Option<String>,
    pub config_source: ConfigSource,
    pub overrides: CompletionOverrides,
    pub server_commands: Vec<String>,
}

/// Resolve the config path in the order: CLI override → env var → default.
/// Only the default is allowed to be missing.
pub fn resolve_config_source(override_path: Option<PathBuf>) -> Result<ConfigSource> {
    let (path, explicit) = match override_path
        .or_else(|| env::var_os(CONFIG_ENV_KEY).map(PathBuf::from))
    {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    if path.is_absolute() {
        return Ok(ConfigSource { path, explicit });
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok(ConfigSource {
        path: cwd.join(path),
        explicit,
    })
}

/// `--model` beats `CLAUDE_MODEL`; credentials and endpoint come from env.
pub fn resolve_overrides(model_override: Option<String>) -> CompletionOverrides {
    CompletionOverrides {
        model: model_override
            .and_then(|v| normalize(&v))
            .or_else(|| env_value(MODEL_ENV)),
        api_key: env_value(API_KEY_ENV),
        endpoint: env_value(BASE_URL_ENV),
    }
}

/// Launch config for the document server embedded in this executable.
pub fn doc_server_launch() -> Result<ServerLaunchConfig> {
    let exe = env::current_exe().context("failed to locate the current executable")?;
    Ok(ServerLaunchConfig::new(
        DOC_SERVER_ID,
        exe.display().to_string(),
        [SERVE_SUBCOMMAND],
    ))
}

/// Built-in server first, then positional command lines, then config entries.
pub fn build_launch_configs(
    doc_server: ServerLaunchConfig,
    server_commands: &[String],
    configured: &[ServerLaunchConfig],
) -> Result<Vec<ServerLaunchConfig>> {
    let mut launches = vec![doc_server];
    for (index, line) in server_commands.iter().enumerate() {
        let identifier = format!("client_{index}_{}", line.trim());
        let launch = ServerLaunchConfig::from_command_line(identifier, line)
            .ok_or_else(|| anyhow!("server command #{index} is empty"))?;
        launches.push(launch);
    }
    launches.extend(configured.iter().cloned());
    Ok(launches)
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|v| normalize(&v))
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
