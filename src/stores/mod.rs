//! Vector storage: the on-disk record model and the store contract.
//!
//! One collection holds a [`CollectionManifest`] plus one [`EmbeddingRecord`]
//! per embedded document, keyed by a stable content-derived id. The pipeline
//! is the only writer during a run; the search engine reads concurrently and
//! tolerates records that are still being written (it simply does not see
//! them yet, never a half-written record).

pub mod fs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::MillError;

pub use fs::FsVectorStore;

/// One embedded document as persisted in a collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Stable id derived from the source name; see [`stable_record_id`].
    pub id: String,
    /// Human-readable title or filename of the source.
    pub source_name: String,
    /// Logical location of the source (URL or file path), for citation.
    pub source_path: String,
    /// The normalized text that was embedded.
    pub text: String,
    /// Unit-length embedding vector.
    pub embedding: Vec<f32>,
    /// Vector width, stored redundantly for validation.
    pub dimensions: usize,
    /// When the embedding was computed.
    pub embedded_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    /// Checks the record's internal consistency and, when known, its
    /// agreement with the collection-wide dimensionality.
    pub fn validate(&self, collection_dimensions: Option<usize>) -> Result<(), MillError> {
        if self.embedding.len() != self.dimensions {
            return Err(MillError::CorruptRecord {
                id: self.id.clone(),
                reason: format!(
                    "embedding length {} disagrees with stored dimensions {}",
                    self.embedding.len(),
                    self.dimensions
                ),
            });
        }
        if let Some(expected) = collection_dimensions {
            if self.dimensions != expected {
                return Err(MillError::CorruptRecord {
                    id: self.id.clone(),
                    reason: format!(
                        "record dimensions {} disagree with collection dimensions {expected}",
                        self.dimensions
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Collection-wide configuration; the single source of truth for `dimensions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionManifest {
    /// Record count at the last successful full pass.
    pub total: usize,
    /// Vector width every record must agree with.
    pub dimensions: usize,
}

/// Derives the stable record id for a source name: the first 16 bytes of
/// `sha256(name)` in lowercase hex. Content-derived, never positional, so
/// records survive insertions and deletions in the source set.
pub fn stable_record_id(source_name: &str) -> String {
    let digest = Sha256::digest(source_name.as_bytes());
    digest[..16].iter().fold(
        String::with_capacity(32),
        |mut out, byte| {
            use std::fmt::Write;
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}

/// Durable, append-friendly storage for one collection of embedding records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Atomically persists one record, fully replacing any prior record with
    /// the same id. Creates the collection container on first write.
    async fn put(&self, record: &EmbeddingRecord) -> Result<(), MillError>;

    /// Reads the collection manifest, if one has been written.
    async fn manifest(&self) -> Result<Option<CollectionManifest>, MillError>;

    /// Writes the collection manifest.
    async fn put_manifest(&self, manifest: &CollectionManifest) -> Result<(), MillError>;

    /// Reads every record currently persisted. Each call re-reads the current
    /// on-disk state; records that fail to parse or validate are skipped and
    /// logged, never fatal.
    async fn list_all(&self) -> Result<Vec<EmbeddingRecord>, MillError>;

    /// Whether a record with this id exists, without loading its content.
    async fn contains(&self, id: &str) -> Result<bool, MillError>;

    /// When the record with this id was last written, without loading its
    /// content. `None` if the record does not exist.
    async fn last_modified(&self, id: &str) -> Result<Option<DateTime<Utc>>, MillError>;

    /// Number of records currently persisted.
    async fn count(&self) -> Result<usize, MillError>;
}
