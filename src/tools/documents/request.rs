use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_DOC_ID_LEN: usize = 256;

/// Input for `read_doc`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadDocRequest {
    /// Id of the document to read (for example `plan.md`).
    pub doc_id: String,
}

impl ReadDocRequest {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        validate_doc_id(&self.doc_id)
    }
}

/// Input for `edit_doc`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditDocRequest {
    /// Id of the document to edit.
    pub doc_id: String,
    /// Text to replace. Must match exactly, including whitespace.
    pub old_text: String,
    /// Replacement text inserted in place of the first match.
    pub new_text: String,
}

impl EditDocRequest {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        validate_doc_id(&self.doc_id)?;
        if self.old_text.is_empty() {
            return Err(RequestValidationError::EmptyOldText);
        }
        Ok(())
    }
}

/// Arguments shared by the document prompts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocPromptArgs {
    /// Id of the document the prompt operates on.
    pub doc_id: String,
}

impl DocPromptArgs {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        validate_doc_id(&self.doc_id)
    }
}

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("doc_id is required")]
    MissingDocId,
    #[error("doc_id is too long ({length} characters, max {MAX_DOC_ID_LEN})")]
    DocIdTooLong { length: usize },
    #[error("old_text must not be empty")]
    EmptyOldText,
}

fn validate_doc_id(doc_id: &str) -> Result<(), RequestValidationError> {
    if doc_id.trim().is_empty() {
        return Err(RequestValidationError::MissingDocId);
    }
    let length = doc_id.chars().count();
    if length > MAX_DOC_ID_LEN {
        return Err(RequestValidationError::DocIdTooLong { length });
    }
    Ok(())
}
