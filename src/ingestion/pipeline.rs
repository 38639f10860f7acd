//! Incremental embedding pipeline.
//!
//! One run walks a [`DocumentSource`], skips what is already up to date,
//! embeds the rest through the injected [`EmbeddingProvider`], persists each
//! record, and advances a durable checkpoint after every item so an
//! interrupted run can resume where it stopped.
//!
//! Run phases: `Idle -> Initializing -> Scanning -> Processing -> Completed`
//! (or `Failed`). Per-item failures are contained and reported as events;
//! only systemic failures (provider unavailable, unreadable source root,
//! persistently failing writes) abort the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingProvider;
use crate::normalize;
use crate::stores::{CollectionManifest, EmbeddingRecord, VectorStore, stable_record_id};
use crate::types::MillError;

use super::checkpoint::{CheckpointStore, ProgressCheckpoint};
use super::events::{PipelineEvent, SkipReason};
use super::source::{DocumentSource, SourceDocument};

/// Tunable policy for a pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Normalized text shorter than this is not worth embedding.
    pub min_text_chars: usize,
    /// Hard ceiling on text size before the embedding call.
    pub max_text_chars: usize,
    /// Persist the checkpoint and emit a `Processing` event every N items.
    pub progress_every: usize,
    /// Abort the run after this many consecutive persist failures.
    pub max_consecutive_persist_failures: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 60,
            max_text_chars: 1_000_000,
            progress_every: 1,
            max_consecutive_persist_failures: 5,
        }
    }
}

/// Externally observable phase of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Initializing,
    Scanning,
    Processing,
    Completed,
    Failed,
}

/// How a run ended, short of a fatal error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { processed: usize, total: usize },
    Cancelled { processed: usize, total: usize },
    /// The source set was empty.
    NothingToDo,
}

/// Cooperative cancellation handle for an in-flight run.
///
/// Stopping takes effect at the next item boundary; the item being embedded
/// finishes or is dropped whole, never persisted partially.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum ItemOutcome {
    Embedded,
    Skipped(SkipReason),
}

/// The incremental embedding pipeline. Construct via [`EmbeddingPipeline::builder`].
pub struct EmbeddingPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    checkpoints: CheckpointStore,
    config: PipelineConfig,
    events: Option<flume::Sender<PipelineEvent>>,
    stop: Arc<AtomicBool>,
    phase: Mutex<PipelinePhase>,
}

impl EmbeddingPipeline {
    pub fn builder() -> EmbeddingPipelineBuilder {
        EmbeddingPipelineBuilder::default()
    }

    /// Handle for cancelling the current (or next) run.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    pub fn phase(&self) -> PipelinePhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: PipelinePhase) {
        *self.phase.lock() = phase;
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    /// Runs one pass over `source`.
    ///
    /// With `resume = true` an incomplete checkpoint positions the pass after
    /// the last processed document; with `resume = false` the checkpoint is
    /// reset first. Vector store records are never deleted by either mode.
    pub async fn run(
        &self,
        source: &dyn DocumentSource,
        resume: bool,
    ) -> Result<RunOutcome, MillError> {
        self.stop.store(false, Ordering::Relaxed);
        let result = self.run_inner(source, resume).await;
        self.provider.dispose().await;
        match result {
            Ok(outcome) => {
                let phase = match &outcome {
                    RunOutcome::Cancelled { .. } => PipelinePhase::Idle,
                    _ => PipelinePhase::Completed,
                };
                self.set_phase(phase);
                Ok(outcome)
            }
            Err(err) => {
                self.set_phase(PipelinePhase::Failed);
                self.emit(PipelineEvent::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        source: &dyn DocumentSource,
        resume: bool,
    ) -> Result<RunOutcome, MillError> {
        self.set_phase(PipelinePhase::Initializing);
        self.provider.init().await?;
        let dimensions = self.provider.dimensions();
        match self.store.manifest().await? {
            Some(manifest) if manifest.dimensions != dimensions => {
                return Err(MillError::DimensionMismatch {
                    expected: manifest.dimensions,
                    actual: dimensions,
                });
            }
            Some(_) => {}
            None => {
                self.store
                    .put_manifest(&CollectionManifest {
                        total: 0,
                        dimensions,
                    })
                    .await?;
            }
        }

        self.set_phase(PipelinePhase::Scanning);
        let documents = source.enumerate().await?;
        let total = documents.len();
        info!(source = %source.describe(), total, resume, "scan complete");

        let previous = if resume {
            self.checkpoints
                .load()
                .await?
                .filter(|checkpoint| !checkpoint.is_complete)
        } else {
            self.checkpoints.reset().await?;
            None
        };

        if documents.is_empty() {
            self.checkpoints
                .save(&ProgressCheckpoint {
                    processed_count: 0,
                    total_count: 0,
                    last_processed_id: None,
                    is_complete: true,
                })
                .await?;
            self.emit(PipelineEvent::NothingToDo);
            info!("nothing to do");
            return Ok(RunOutcome::NothingToDo);
        }

        let start_index = resume_offset(
            &documents,
            previous
                .as_ref()
                .and_then(|checkpoint| checkpoint.last_processed_id.as_deref()),
        );
        let mut checkpoint = ProgressCheckpoint {
            processed_count: start_index,
            total_count: total,
            last_processed_id: if start_index > 0 {
                previous.and_then(|checkpoint| checkpoint.last_processed_id)
            } else {
                None
            },
            is_complete: false,
        };
        if start_index > 0 {
            info!(start_index, "resuming after last processed document");
        }

        self.set_phase(PipelinePhase::Processing);
        let mut consecutive_persist_failures = 0usize;
        let mut since_progress = 0usize;

        for document in documents.iter().skip(start_index) {
            if self.stop.load(Ordering::Relaxed) {
                self.checkpoints.save(&checkpoint).await?;
                info!(
                    processed = checkpoint.processed_count,
                    total, "run cancelled"
                );
                return Ok(RunOutcome::Cancelled {
                    processed: checkpoint.processed_count,
                    total,
                });
            }

            let id = stable_record_id(&document.name);
            match self.process_document(&id, document, dimensions).await {
                Ok(ItemOutcome::Embedded) => {
                    consecutive_persist_failures = 0;
                    debug!(id = %id, name = %document.name, "embedded");
                }
                Ok(ItemOutcome::Skipped(reason)) => {
                    consecutive_persist_failures = 0;
                    debug!(id = %id, name = %document.name, ?reason, "skipped");
                    self.emit(PipelineEvent::Skipped {
                        id: id.clone(),
                        reason,
                    });
                }
                Err(err) => {
                    warn!(id = %id, name = %document.name, error = %err, "document failed, continuing");
                    self.emit(PipelineEvent::ItemFailed {
                        id: id.clone(),
                        message: err.to_string(),
                    });
                    if matches!(err, MillError::Persist { .. }) {
                        consecutive_persist_failures += 1;
                        if consecutive_persist_failures
                            >= self.config.max_consecutive_persist_failures
                        {
                            return Err(err);
                        }
                    } else {
                        consecutive_persist_failures = 0;
                    }
                }
            }

            checkpoint.processed_count += 1;
            checkpoint.last_processed_id = Some(id.clone());
            since_progress += 1;
            if since_progress >= self.config.progress_every || checkpoint.processed_count == total {
                since_progress = 0;
                self.checkpoints.save(&checkpoint).await?;
                self.emit(PipelineEvent::Processing {
                    processed: checkpoint.processed_count,
                    total,
                    last_id: id,
                });
            }
        }

        checkpoint.is_complete = true;
        self.checkpoints.save(&checkpoint).await?;
        let stored = self.store.count().await?;
        self.store
            .put_manifest(&CollectionManifest {
                total: stored,
                dimensions,
            })
            .await?;
        self.emit(PipelineEvent::Completed {
            processed: checkpoint.processed_count,
            total,
        });
        info!(
            processed = checkpoint.processed_count,
            total, stored, "run complete"
        );
        Ok(RunOutcome::Completed {
            processed: checkpoint.processed_count,
            total,
        })
    }

    async fn process_document(
        &self,
        id: &str,
        document: &SourceDocument,
        dimensions: usize,
    ) -> Result<ItemOutcome, MillError> {
        if self.store.contains(id).await? {
            if let Some(stored_at) = self.store.last_modified(id).await? {
                if stored_at >= document.last_modified {
                    return Ok(ItemOutcome::Skipped(SkipReason::UpToDate));
                }
            }
        }

        let normalized = normalize::normalize(document.format, &document.raw_content)?;
        let text_chars = normalized.text.chars().count();
        if text_chars < self.config.min_text_chars {
            return Ok(ItemOutcome::Skipped(SkipReason::TooShort));
        }
        if text_chars > self.config.max_text_chars {
            return Ok(ItemOutcome::Skipped(SkipReason::TooLarge));
        }

        let embedding = self.provider.embed(&normalized.text).await?;
        if embedding.len() != dimensions {
            return Err(MillError::DimensionMismatch {
                expected: dimensions,
                actual: embedding.len(),
            });
        }

        let record = EmbeddingRecord {
            id: id.to_string(),
            source_name: document.name.clone(),
            source_path: normalized
                .source_url
                .unwrap_or_else(|| document.location.clone()),
            text: normalized.text,
            embedding,
            dimensions,
            embedded_at: Utc::now(),
        };
        if let Err(first) = self.store.put(&record).await {
            warn!(id = %id, error = %first, "persist failed, retrying once");
            self.store
                .put(&record)
                .await
                .map_err(|err| MillError::Persist {
                    id: id.to_string(),
                    reason: err.to_string(),
                })?;
        }
        Ok(ItemOutcome::Embedded)
    }
}

/// Index of the first document not yet processed, given the checkpointed id
/// of the last processed one. An id that no longer appears in the set means
/// the enumeration changed; the pass restarts and the per-item up-to-date
/// check keeps already-embedded documents cheap.
fn resume_offset(documents: &[SourceDocument], last_processed_id: Option<&str>) -> usize {
    let Some(last) = last_processed_id else {
        return 0;
    };
    documents
        .iter()
        .position(|document| stable_record_id(&document.name) == last)
        .map(|index| index + 1)
        .unwrap_or(0)
}

/// Builder for [`EmbeddingPipeline`].
#[derive(Default)]
pub struct EmbeddingPipelineBuilder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    checkpoints: Option<CheckpointStore>,
    config: PipelineConfig,
    events: Option<flume::Sender<PipelineEvent>>,
}

impl EmbeddingPipelineBuilder {
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn checkpoints(mut self, checkpoints: CheckpointStore) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Channel that receives [`PipelineEvent`]s during runs.
    #[must_use]
    pub fn events(mut self, sender: flume::Sender<PipelineEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if `provider`, `store`, or `checkpoints` was not set.
    pub fn build(self) -> EmbeddingPipeline {
        EmbeddingPipeline {
            provider: self
                .provider
                .expect("EmbeddingPipelineBuilder requires a provider"),
            store: self.store.expect("EmbeddingPipelineBuilder requires a store"),
            checkpoints: self
                .checkpoints
                .expect("EmbeddingPipelineBuilder requires a checkpoint store"),
            config: self.config,
            events: self.events,
            stop: Arc::new(AtomicBool::new(false)),
            phase: Mutex::new(PipelinePhase::Idle),
        }
    }
}
