use std::{fmt, path::Path, time::Duration};

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;
const MAX_TOOL_ROUNDS_LIMIT: usize = 32;

/// Completion service settings.
#[derive(Clone)]
pub struct CompletionSection {
    pub model: String,
    pub api_key: String,
    pub endpoint: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_tool_rounds: usize,
}

impl fmt::Debug for CompletionSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSection")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawCompletionSection {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_tool_rounds: Option<usize>,
}

/// Values resolved from the CLI and environment; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct CompletionOverrides {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

pub fn parse_completion_section(
    raw: Option<RawCompletionSection>,
    overrides: &CompletionOverrides,
    path: &Path,
) -> Result<CompletionSection, ConfigError> {
    let raw = raw.unwrap_or_default();

    let model = non_blank(overrides.model.clone())
        .or_else(|| non_blank(raw.model))
        .ok_or(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: "completion.model",
            hint: "set CLAUDE_MODEL, pass --model, or add [completion].model",
        })?;
    let api_key = non_blank(overrides.api_key.clone())
        .or_else(|| non_blank(raw.api_key))
        .ok_or(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: "completion.api_key",
            hint: "set ANTHROPIC_API_KEY or add [completion].api_key",
        })?;
    let endpoint = non_blank(overrides.endpoint.clone())
        .or_else(|| non_blank(raw.endpoint))
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    validate_endpoint(&endpoint, path)?;

    let max_tokens = raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "completion.max_tokens",
            message: "must be greater than zero".into(),
        });
    }

    let timeout_secs = raw
        .timeout_secs
        .unwrap_or(DEFAULT_COMPLETION_TIMEOUT_SECS);
    super::validate_timeout_secs(timeout_secs, "completion.timeout_secs", path)?;

    let max_tool_rounds = raw.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);
    if !(1..=MAX_TOOL_ROUNDS_LIMIT).contains(&max_tool_rounds) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "completion.max_tool_rounds",
            message: format!("Use a value in the range 1-{MAX_TOOL_ROUNDS_LIMIT}"),
        });
    }

    Ok(CompletionSection {
        model,
        api_key,
        endpoint: endpoint.trim_end_matches('/').to_string(),
        max_tokens,
        timeout: Duration::from_secs(timeout_secs),
        max_tool_rounds,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_endpoint(endpoint: &str, path: &Path) -> Result<(), ConfigError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(());
    }
    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "completion.endpoint",
        message: format!("`{endpoint}` must start with http:// or https://"),
    })
}
