//! ```text
//! DocumentSource ──► ingestion::EmbeddingPipeline ──┬─► normalize (storage / markdown)
//!                                                   ├─► embedding::EmbeddingProvider
//!                                                   ├─► stores::FsVectorStore (records + manifest)
//!                                                   └─► CheckpointStore + PipelineEvent channel
//!
//! Query ──► search::SearchEngine ──► embed query ──► cosine scan over VectorStore
//!                                                   └─► ranked (text, score, source) results
//! ```
//!
//! Incremental embedding and retrieval core for a local-first RAG assistant:
//! documents are normalized to plain text, embedded through an injected
//! provider, and persisted one crash-tolerant record at a time; queries run
//! a brute-force cosine scan against the persisted collection. Runs are
//! resumable from a durable checkpoint and skip documents whose stored
//! record is still newer than the source.

pub mod embedding;
pub mod ingestion;
pub mod normalize;
pub mod search;
pub mod stores;
pub mod types;

pub use embedding::{EmbeddingProvider, HashedEmbedder, OllamaEmbedder};
pub use ingestion::{
    CheckpointStore, DirectorySource, DocumentSource, EmbeddingPipeline, PipelineConfig,
    PipelineEvent, ProgressCheckpoint, RunOutcome, SourceDocument, StopHandle,
};
pub use normalize::DocumentFormat;
pub use search::{SearchEngine, SearchResult, cosine_similarity};
pub use stores::{CollectionManifest, EmbeddingRecord, FsVectorStore, VectorStore, stable_record_id};
pub use types::MillError;
