use std::path::PathBuf;

use config::ConfigError as ConfigLoaderError;
use rmcp::model::ErrorData;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Required field is missing.
    #[error("Configuration is missing `{field}` (file: {path}); {hint}")]
    MissingField {
        path: PathBuf,
        field: &'static str,
        hint: &'static str,
    },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Failure class carried in the `kind` field of tool error payloads.
///
/// Clients read this field back to tell a missing entity apart from a bad
/// argument without parsing the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
        }
    }

    /// Parse the wire form written by [`ErrorKind::as_str`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "not_found" => Some(ErrorKind::NotFound),
            "invalid_argument" => Some(ErrorKind::InvalidArgument),
            _ => None,
        }
    }
}

/// Structured error metadata returned by MCP tools.
#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorDescriptor {
    /// Error code.
    pub code: &'static str,
    /// Failure class.
    pub kind: ErrorKind,
    /// User-facing message.
    pub message: &'static str,
    /// Recommended remediation.
    pub remediation: &'static str,
}

impl ToolErrorDescriptor {
    /// Simple constructor.
    pub const fn new(
        code: &'static str,
        kind: ErrorKind,
        message: &'static str,
        remediation: &'static str,
    ) -> Self {
        Self {
            code,
            kind,
            message,
            remediation,
        }
    }

    /// Create a builder.
    pub fn builder(&self) -> ToolErrorDescriptorBuilder<'_> {
        ToolErrorDescriptorBuilder::new(self)
    }
}

/// Builder for error data that fails if required fields are missing.
pub struct ToolErrorDescriptorBuilder<'a> {
    descriptor: &'a ToolErrorDescriptor,
    retryable: Option<bool>,
    details: Option<Value>,
    extra_fields: Map<String, Value>,
}

impl<'a> ToolErrorDescriptorBuilder<'a> {
    pub fn new(descriptor: &'a ToolErrorDescriptor) -> Self {
        Self {
            descriptor,
            retryable: None,
            details: None,
            extra_fields: Map::new(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }

    pub fn with_exit_code_value(mut self, exit_code: u8) -> Self {
        let numeric = Number::from(exit_code);
        self.extra_fields
            .insert("exit_code".into(), Value::Number(numeric));
        self
    }

    pub fn build(self) -> Result<ErrorData, ToolErrorBuilderError> {
        if self.descriptor.remediation.trim().is_empty() {
            return Err(ToolErrorBuilderError::MissingRemediation {
                code: self.descriptor.code,
            });
        }
        let retryable = self
            .retryable
            .ok_or(ToolErrorBuilderError::MissingRetryable {
                code: self.descriptor.code,
            })?;

        let mut data = Map::new();
        data.insert("code".into(), Value::String(self.descriptor.code.into()));
        data.insert(
            "kind".into(),
            Value::String(self.descriptor.kind.as_str().into()),
        );
        data.insert(
            "remediation".into(),
            Value::String(self.descriptor.remediation.into()),
        );
        data.insert("retryable".into(), Value::Bool(retryable));
        if let Some(details) = self.details {
            data.insert("details".into(), details);
        }
        for (key, value) in self.extra_fields {
            data.insert(key, value);
        }

        let data = Some(Value::Object(data));
        Ok(match self.descriptor.kind {
            ErrorKind::NotFound => ErrorData::resource_not_found(self.descriptor.message, data),
            ErrorKind::InvalidArgument => ErrorData::invalid_params(self.descriptor.message, data),
        })
    }
}

/// Errors when required builder fields are missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolErrorBuilderError {
    #[error("retryable is missing (code={code})")]
    MissingRetryable { code: &'static str },
    #[error("remediation is empty (code={code})")]
    MissingRemediation { code: &'static str },
}

/// Read the `kind` field from an error payload produced by the builder.
pub fn error_kind_of(error: &ErrorData) -> Option<ErrorKind> {
    error
        .data
        .as_ref()
        .and_then(|data| data.get("kind"))
        .and_then(Value::as_str)
        .and_then(ErrorKind::parse)
}

/// Standard error when the server is executed without an MCP client.
pub const MCP_CLIENT_REQUIRED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "MCP_CLIENT_REQUIRED",
    ErrorKind::InvalidArgument,
    "The document server can only be executed via an MCP client",
    "Launch it through `mcp-chat` (which spawns `mcp-chat serve` itself) or an MCP inspector.",
);
