//! Incremental ingestion: sources, checkpointing, events, and the pipeline.

pub mod checkpoint;
pub mod events;
pub mod pipeline;
pub mod source;

pub use checkpoint::{CheckpointStore, ProgressCheckpoint};
pub use events::{PipelineEvent, SkipReason};
pub use pipeline::{
    EmbeddingPipeline, EmbeddingPipelineBuilder, PipelineConfig, PipelinePhase, RunOutcome,
    StopHandle,
};
pub use source::{DirectorySource, DocumentSource, SourceDocument};
