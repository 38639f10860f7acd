//! Crate-wide error taxonomy.
//!
//! A single [`MillError`] covers every failure surface of the crate. Which
//! variants are fatal depends on where they occur: the pipeline treats
//! [`MillError::ModelUnavailable`] and repeated persist failures as fatal for
//! the whole run, while per-item failures are contained, logged, and skipped.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the embedding, storage, ingestion, and search layers.
#[derive(Debug, Error)]
pub enum MillError {
    /// The embedding provider could not acquire its model or backing service.
    /// Fatal for the run that triggered initialization.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// A single embedding call failed. Recoverable; the pipeline skips the
    /// item and continues.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A source document (or the source root itself) could not be read.
    #[error("source '{name}' unreadable: {reason}")]
    SourceUnreadable { name: String, reason: String },

    /// Raw markup could not be converted to plain text.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// A record could not be written to the vector store, even after retry.
    #[error("persist failed for record '{id}': {reason}")]
    Persist { id: String, reason: String },

    /// A similarity query exceeded its time budget. Retryable; distinct from
    /// an empty result set.
    #[error("search timed out after {0:?}")]
    SearchTimeout(Duration),

    /// A stored record failed schema or dimension validation on read.
    #[error("corrupt record '{id}': {reason}")]
    CorruptRecord { id: String, reason: String },

    /// A vector's length disagrees with the collection's configured
    /// dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Codec(#[from] serde_json::Error),
}
