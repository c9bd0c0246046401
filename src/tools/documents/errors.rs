//! Centralized error-to-ErrorData mapping for document tools.
use rmcp::model::ErrorData;
use serde_json::{json, Value};

use crate::lib::errors::{ErrorKind, ToolErrorDescriptor};

use super::{request::RequestValidationError, store::DocumentError};

const DOCUMENT_NOT_FOUND_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "document_not_found",
    ErrorKind::InvalidArgument,
    "Document not found",
    "Read the docs://documents resource for the list of valid document ids.",
);
const TEXT_NOT_FOUND_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "text_not_found",
    ErrorKind::InvalidArgument,
    "Original text not found in document",
    "Read the document first and pass an exact substring as old_text.",
);
const INVALID_INPUT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "invalid_request",
    ErrorKind::InvalidArgument,
    "The document request format is invalid",
    "Provide a non-empty doc_id and, for edits, a non-empty old_text.",
);
const RESOURCE_NOT_FOUND_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "resource_not_found",
    ErrorKind::NotFound,
    "Resource not found",
    "Use docs://documents or docs://documents/{doc_id} with an existing id.",
);
const UNKNOWN_TOOL_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "unknown_tool",
    ErrorKind::NotFound,
    "Tool not found",
    "Call tools/list for the tool names this server registers.",
);
const UNKNOWN_PROMPT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "unknown_prompt",
    ErrorKind::NotFound,
    "Prompt not found",
    "Call prompts/list for the prompt names this server registers.",
);

/// Map a tool-level document failure. A missing document is an invalid
/// argument for tools and prompts; only resource reads report `not_found`.
pub fn document_error_to_error_data(err: DocumentError) -> ErrorData {
    match err {
        DocumentError::NotFound { doc_id } => build_error_data(
            &DOCUMENT_NOT_FOUND_ERROR,
            json!({ "doc_id": doc_id }),
            false,
        ),
        DocumentError::TextNotFound { doc_id } => {
            build_error_data(&TEXT_NOT_FOUND_ERROR, json!({ "doc_id": doc_id }), true)
        }
    }
}

pub fn validation_error_to_error_data(err: RequestValidationError) -> ErrorData {
    build_error_data(
        &INVALID_INPUT_ERROR,
        json!({ "details": err.to_string() }),
        false,
    )
}

pub fn resource_not_found(uri: &str) -> ErrorData {
    build_error_data(&RESOURCE_NOT_FOUND_ERROR, json!({ "uri": uri }), false)
}

pub fn unknown_tool(name: &str) -> ErrorData {
    unknown_name(&UNKNOWN_TOOL_ERROR, "tool", name)
}

pub fn unknown_prompt(name: &str) -> ErrorData {
    unknown_name(&UNKNOWN_PROMPT_ERROR, "prompt", name)
}

fn unknown_name(desc: &'static ToolErrorDescriptor, field: &str, name: &str) -> ErrorData {
    desc.builder()
        .retryable(false)
        .with_context_field(field, json!(name))
        .build()
        .unwrap_or_else(|err| ErrorData::internal_error(err.to_string(), None))
}

fn build_error_data(desc: &'static ToolErrorDescriptor, details: Value, retryable: bool) -> ErrorData {
    desc.builder()
        .details(details)
        .retryable(retryable)
        .build()
        .unwrap_or_else(|err| ErrorData::internal_error(err.to_string(), None))
}
