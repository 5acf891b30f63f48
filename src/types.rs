//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the pipeline returns [`RagError`]. The
//! variants map one-to-one onto failure kinds callers are expected to match
//! on: the ingestion path treats all of them as fatal, while the query loop
//! keeps running through [`RagError::Embedding`], [`RagError::Query`], and
//! [`RagError::DimensionMismatch`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The article corpus could not be reached or its response could not be
    /// understood.
    #[error("dataset source unavailable: {0}")]
    SourceUnavailable(String),

    /// The corpus answered, but holds fewer articles than requested.
    #[error("dataset source supplied {available} articles, {requested} requested")]
    SourceExhausted { requested: usize, available: usize },

    /// The embedding backend failed or broke its one-vector-per-input
    /// contract.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Invalid chunking parameters or a chunking-stage failure.
    #[error("chunking failed: {0}")]
    Chunking(String),

    /// A collection with this name already exists; ingestion never merges
    /// into or overwrites an existing collection.
    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    /// Collection names become SQLite table names and must be plain
    /// identifiers.
    #[error("collection name '{0}' is not a valid identifier")]
    InvalidCollectionName(String),

    /// An embedding's length does not match the collection dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A nearest-neighbor query that cannot be answered as posed, e.g. more
    /// results requested than the collection holds.
    #[error("query failed: {0}")]
    Query(String),

    /// Anything the storage layer reports: connection, SQL, or extension
    /// failures.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}
