//! Document tools, resources and prompts exposed by `mcp-chat serve`.

pub mod errors;
pub mod request;
pub mod store;

pub use errors::{
    document_error_to_error_data, resource_not_found, unknown_prompt, unknown_tool,
    validation_error_to_error_data,
};
pub use request::{DocPromptArgs, EditDocRequest, ReadDocRequest, RequestValidationError};
pub use store::{DocumentError, DocumentStore, SEED_DOCUMENTS};

/// Resource listing every document id as a JSON array.
pub const DOCUMENTS_URI: &str = "docs://documents";
/// Template for a single document; `{doc_id}` is resolved at read time.
pub const DOCUMENT_URI_TEMPLATE: &str = "docs://documents/{doc_id}";
const DOCUMENT_URI_PREFIX: &str = "docs://documents/";

/// What a `docs://` uri points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentResource {
    Index,
    Document(String),
}

/// Resolve a concrete uri against the two document resources.
pub fn parse_document_uri(uri: &str) -> Option<DocumentResource> {
    if uri == DOCUMENTS_URI {
        return Some(DocumentResource::Index);
    }
    let doc_id = uri.strip_prefix(DOCUMENT_URI_PREFIX)?;
    if doc_id.is_empty() || doc_id.contains('/') {
        return None;
    }
    Some(DocumentResource::Document(doc_id.to_string()))
}

pub fn document_uri(doc_id: &str) -> String {
    format!("{DOCUMENT_URI_PREFIX}{doc_id}")
}

pub fn format_prompt_text(doc_id: &str, content: &str) -> String {
    format!(
        "Rewrite the document '{doc_id}' as polished Markdown. \
         Use descriptive headings, bullet or numbered lists when useful, \
         preserve all factual details, and avoid commentary about the rewrite.\n\n\
         Document contents:\n{content}"
    )
}

pub fn summarize_prompt_text(doc_id: &str, content: &str) -> String {
    format!(
        "Summarize the document '{doc_id}' in at most three sentences. \
         Keep names, figures and dates exactly as written and do not add \
         information that is not in the document.\n\n\
         Document contents:\n{content}"
    )
}
