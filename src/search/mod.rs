//! Brute-force cosine-similarity search over a vector store.
//!
//! Every query embeds the query text, scores it against each persisted
//! record, and returns the top k. The scan is O(N·D) per query, which holds
//! up for local corpora in the thousands; re-reading the store each time
//! means a concurrently running pipeline is picked up without coordination.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::stores::VectorStore;
use crate::types::MillError;

/// One ranked hit.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub text: String,
    pub score: f32,
    pub source_name: String,
    pub source_path: String,
}

/// Read-only query engine over a collection.
pub struct SearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl SearchEngine {
    pub const DEFAULT_TOP_K: usize = 3;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            provider,
            store,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns up to `k` records ranked by cosine similarity to `query`,
    /// best first. An empty store yields an empty result, not an error; a
    /// query that outlives the time budget yields
    /// [`MillError::SearchTimeout`].
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, MillError> {
        match tokio::time::timeout(self.timeout, self.rank(query, k)).await {
            Ok(result) => result,
            Err(_) => Err(MillError::SearchTimeout(self.timeout)),
        }
    }

    async fn rank(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, MillError> {
        let query_vector = self.provider.embed(query).await?;
        let records = self.store.list_all().await?;
        debug!(candidates = records.len(), k, "scoring query");

        let mut results: Vec<SearchResult> = records
            .into_iter()
            .map(|record| {
                let score = cosine_similarity(&query_vector, &record.embedding);
                SearchResult {
                    text: record.text,
                    score,
                    source_name: record.source_name,
                    source_path: record.source_path,
                }
            })
            .collect();
        // Stable sort: ties keep store iteration order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Defined as `0.0` when either vector has zero norm, so ranking stays
/// well-defined instead of producing NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
