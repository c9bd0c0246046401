use tracing::{debug, info};

use super::{AppConfig, CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH};

pub fn log_source(path: &std::path::Path, explicit: bool, exists: bool) {
    if explicit {
        info!(
            target: "mcp_chat::config",
            path = %path.display(),
            "Loading configuration from explicitly named file"
        );
    } else {
        debug!(
            target: "mcp_chat::config",
            path = %path.display(),
            env = CONFIG_ENV_KEY,
            default = DEFAULT_CONFIG_PATH,
            exists,
            "No config file named; using the default path if present"
        );
    }
}

pub fn log_loaded(config: &AppConfig) {
    info!(
        target: "mcp_chat::config",
        path = %config.source_path.display(),
        model = %config.completion.model,
        endpoint = %config.completion.endpoint,
        max_tool_rounds = config.completion.max_tool_rounds,
        handshake_timeout_ms = config.connection.handshake_timeout.as_millis(),
        request_timeout_ms = config.connection.request_timeout.as_millis(),
        extra_servers = config.servers.len(),
        "Configuration loaded successfully"
    );
}
