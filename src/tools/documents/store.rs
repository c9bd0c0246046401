use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;
use tokio::sync::RwLock;

/// Documents every `mcp-chat serve` process starts with.
pub const SEED_DOCUMENTS: &[(&str, &str)] = &[
    (
        "deposition.md",
        "This deposition covers the testimony of Angela Smith, P.E.",
    ),
    (
        "report.pdf",
        "The report details the state of a 20m condenser tower.",
    ),
    (
        "financials.docx",
        "These financials outline the project's budget and expenditures.",
    ),
    (
        "outlook.pdf",
        "This document presents the projected future performance of the system.",
    ),
    (
        "plan.md",
        "The plan outlines the steps for the project's implementation.",
    ),
    (
        "spec.txt",
        "These specifications define the technical requirements for the equipment.",
    ),
];

/// Domain failures raised by document operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Document `{doc_id}` not found")]
    NotFound { doc_id: String },
    #[error("Original text not found in document `{doc_id}`")]
    TextNotFound { doc_id: String },
}

/// In-memory document map owned by one server process.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl DocumentStore {
    /// Create a store holding [`SEED_DOCUMENTS`].
    pub fn seeded() -> Self {
        Self::from_documents(
            SEED_DOCUMENTS
                .iter()
                .map(|(id, content)| (id.to_string(), content.to_string())),
        )
    }

    pub fn from_documents(documents: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(documents.into_iter().collect())),
        }
    }

    /// Document ids in sorted order.
    pub async fn ids(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn read(&self, doc_id: &str) -> Result<String, DocumentError> {
        self.inner
            .read()
            .await
            .get(doc_id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound {
                doc_id: doc_id.to_string(),
            })
    }

    /// Replace the first occurrence of `old_text` and return the updated content.
    ///
    /// The write lock is held for the whole check-and-replace, so a failed
    /// edit never leaves a partially modified document behind.
    pub async fn edit(
        &self,
        doc_id: &str,
        old_text: &str,
        new_text: &str,
    ) -> Result<String, DocumentError> {
        let mut documents = self.inner.write().await;
        let content = documents
            .get_mut(doc_id)
            .ok_or_else(|| DocumentError::NotFound {
                doc_id: doc_id.to_string(),
            })?;
        if !content.contains(old_text) {
            return Err(DocumentError::TextNotFound {
                doc_id: doc_id.to_string(),
            });
        }
        let updated = content.replacen(old_text, new_text, 1);
        *content = updated.clone();
        Ok(updated)
    }
}
