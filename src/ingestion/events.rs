//! Progress events emitted by a pipeline run.
//!
//! Consumers subscribe by handing the pipeline a `flume::Sender`; each event
//! is a closed, serializable union so UI layers can match on `type` without
//! guessing at payload shapes.

use serde::{Deserialize, Serialize};

/// Why the pipeline advanced past a document without embedding it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The stored record is at least as new as the source document.
    UpToDate,
    /// Normalized text fell below the minimum embeddable length.
    TooShort,
    /// Normalized text exceeded the embedding size ceiling.
    TooLarge,
}

/// One progress message from a pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Periodic progress: counts plus the most recently processed record id.
    Processing {
        processed: usize,
        total: usize,
        last_id: String,
    },
    /// A document was advanced past without a new embedding.
    Skipped { id: String, reason: SkipReason },
    /// A single document failed; the run continues.
    ItemFailed { id: String, message: String },
    /// The run exhausted its input.
    Completed { processed: usize, total: usize },
    /// The source set was empty; there was nothing to embed.
    NothingToDo,
    /// The run aborted on a systemic error.
    Failed { message: String },
}
