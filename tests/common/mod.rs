//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use ragmill::embedding::{EmbeddingProvider, HashedEmbedder};
use ragmill::ingestion::{DocumentSource, SourceDocument, StopHandle};
use ragmill::normalize::DocumentFormat;
use ragmill::types::MillError;

/// An in-memory document source with controllable modification times.
pub struct MemorySource {
    pub documents: Vec<SourceDocument>,
}

impl MemorySource {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn enumerate(&self) -> Result<Vec<SourceDocument>, MillError> {
        Ok(self.documents.clone())
    }
}

/// A plain-text document long enough to clear the minimum-length policy.
pub fn long_document(name: &str, topic: &str, modified: DateTime<Utc>) -> SourceDocument {
    SourceDocument {
        name: name.to_string(),
        location: format!("corpus/{name}"),
        raw_content: format!(
            "{topic}: this body pads the document comfortably past the minimum \
             embeddable length so the pipeline will not discard it as too short."
        ),
        format: DocumentFormat::PlainText,
        last_modified: modified,
    }
}

pub fn an_hour_ago() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

/// Wraps [`HashedEmbedder`] and counts embedding calls; optionally trips a
/// [`StopHandle`] after a set number of embeds to simulate a run that is
/// killed mid-pass.
pub struct CountingProvider {
    inner: HashedEmbedder,
    calls: AtomicUsize,
    stop_after: Option<usize>,
    stop_handle: Mutex<Option<StopHandle>>,
    fail_on_marker: Option<String>,
}

impl CountingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashedEmbedder::with_dimensions(dimensions),
            calls: AtomicUsize::new(0),
            stop_after: None,
            stop_handle: Mutex::new(None),
            fail_on_marker: None,
        }
    }

    /// After `count` successful embeds, trip the registered stop handle.
    pub fn stop_after(mut self, count: usize) -> Self {
        self.stop_after = Some(count);
        self
    }

    /// Fail any embed whose text contains `marker`.
    pub fn fail_on(mut self, marker: &str) -> Self {
        self.fail_on_marker = Some(marker.to_string());
        self
    }

    pub fn register_stop_handle(&self, handle: StopHandle) {
        *self.stop_handle.lock() = Some(handle);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn id(&self) -> &str {
        "counting"
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MillError> {
        if let Some(marker) = &self.fail_on_marker {
            if texts.iter().any(|text| text.contains(marker)) {
                return Err(MillError::Embedding(format!(
                    "refusing text containing '{marker}'"
                )));
            }
        }
        let vectors = self.inner.embed_batch(texts).await?;
        let total = self.calls.fetch_add(texts.len(), Ordering::SeqCst) + texts.len();
        if let Some(limit) = self.stop_after {
            if total >= limit {
                if let Some(handle) = self.stop_handle.lock().as_ref() {
                    handle.stop();
                }
            }
        }
        Ok(vectors)
    }
}

/// A provider whose initialization always fails.
pub struct BrokenProvider;

#[async_trait]
impl EmbeddingProvider for BrokenProvider {
    fn id(&self) -> &str {
        "broken"
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn init(&self) -> Result<(), MillError> {
        Err(MillError::ModelUnavailable(
            "model weights missing".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, MillError> {
        Err(MillError::ModelUnavailable(
            "model weights missing".to_string(),
        ))
    }
}
