use std::path::Path;

use serde::Deserialize;

use crate::{client::ServerLaunchConfig, lib::errors::ConfigError};

/// One `[[servers]]` entry.
#[derive(Debug, Deserialize)]
pub struct RawServerEntry {
    pub id: Option<String>,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

pub fn parse_servers_section(
    raw: Option<Vec<RawServerEntry>>,
    path: &Path,
) -> Result<Vec<ServerLaunchConfig>, ConfigError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let identifier = entry
                .id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .ok_or(ConfigError::MissingField {
                    path: path.to_path_buf(),
                    field: "servers.id",
                    hint: "every [[servers]] entry needs a unique id",
                })?;
            let command = entry
                .command
                .map(|command| command.trim().to_string())
                .filter(|command| !command.is_empty())
                .ok_or(ConfigError::MissingField {
                    path: path.to_path_buf(),
                    field: "servers.command",
                    hint: "every [[servers]] entry needs a command to launch",
                })?;
            Ok(ServerLaunchConfig {
                identifier,
                command,
                args: entry.args,
            })
        })
        .collect()
}
