//! Knowledge-base example corpus: validated extractions used as few-shot
//! examples. Externally owned — the pipeline only queries and appends.

pub mod retriever;
pub mod sqlite_store;

pub use retriever::*;
pub use sqlite_store::*;

use thiserror::Error;

use crate::models::enums::DocumentType;
use crate::models::KnowledgeBaseExample;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Append-only example corpus. Examples are immutable once created, so
/// concurrent readers never need locking.
pub trait KnowledgeStore {
    /// Query examples for a document type, most relevant first.
    /// An empty `carrier` matches any carrier.
    fn query(
        &self,
        document_type: DocumentType,
        carrier: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeBaseExample>, KnowledgeError>;

    fn append(&self, example: &KnowledgeBaseExample) -> Result<(), KnowledgeError>;
}
