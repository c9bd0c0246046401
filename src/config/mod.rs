//! Load and validate client configuration.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::error;

use crate::{
    client::{ConnectionSettings, ServerLaunchConfig},
    lib::errors::ConfigError,
};

pub mod completion;
pub mod connection;
pub mod servers;
pub mod telemetry;

pub use completion::{
    parse_completion_section, CompletionOverrides, CompletionSection, RawCompletionSection,
    DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MAX_TOOL_ROUNDS,
};
pub use connection::{
    parse_connection_section, RawConnectionSection, DEFAULT_HANDSHAKE_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_GRACE_SECS,
};
pub use servers::{parse_servers_section, RawServerEntry};

pub const CONFIG_ENV_KEY: &str = "MCP_CHAT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "mcp-chat.toml";
const MAX_TIMEOUT_SECS: u64 = 600;

/// Where the config file comes from. An explicitly named file must exist;
/// the default path is optional.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub explicit: bool,
}

/// Top-level configuration container.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub completion: CompletionSection,
    pub connection: ConnectionSettings,
    pub servers: Vec<ServerLaunchConfig>,
    pub source_path: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
struct RawAppConfig {
    completion: Option<RawCompletionSection>,
    connection: Option<RawConnectionSection>,
    servers: Option<Vec<RawServerEntry>>,
}

impl AppConfig {
    /// Load the file named by `source` (if any) and apply `overrides`.
    pub fn load(
        source: &ConfigSource,
        overrides: &CompletionOverrides,
    ) -> Result<Self, ConfigError> {
        let path = source.path.clone();
        let exists = path.exists();
        telemetry::log_source(&path, source.explicit, exists);

        let raw = if source.explicit || exists {
            read_raw(&path)?
        } else {
            RawAppConfig::default()
        };

        let config = Self::from_raw(raw, overrides, path.clone()).map_err(|err| {
            error!(
                target: "mcp_chat::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    fn from_raw(
        raw: RawAppConfig,
        overrides: &CompletionOverrides,
        path: PathBuf,
    ) -> Result<Self, ConfigError> {
        let completion = parse_completion_section(raw.completion, overrides, &path)?;
        let connection = parse_connection_section(raw.connection, &path)?;
        let servers = parse_servers_section(raw.servers, &path)?;

        Ok(Self {
            completion,
            connection,
            servers,
            source_path: path,
        })
    }
}

fn read_raw(path: &Path) -> Result<RawAppConfig, ConfigError> {
    let builder =
        config::Config::builder().add_source(config::File::from(path.to_path_buf()).required(true));
    let document = builder.build().map_err(|err| {
        let error = ConfigError::from_read_error(path.to_path_buf(), err);
        error!(
            target: "mcp_chat::config",
            path = %path.display(),
            reason = %error,
            "Failed to read configuration file"
        );
        error
    })?;

    document.try_deserialize().map_err(|err| {
        let error = ConfigError::from_parse_error(path.to_path_buf(), err);
        error!(
            target: "mcp_chat::config",
            path = %path.display(),
            reason = %error,
            "Failed to parse configuration file"
        );
        error
    })
}

fn validate_timeout_secs(value: u64, field: &'static str, path: &Path) -> Result<(), ConfigError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&value) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field,
        message: format!("Use a value in the range 1-{MAX_TIMEOUT_SECS} seconds"),
    })
}
