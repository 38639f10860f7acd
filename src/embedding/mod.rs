//! Embedding provider boundary.
//!
//! The pipeline and search engine receive an [`EmbeddingProvider`] instance at
//! construction time; nothing in the crate holds a global model handle. Two
//! adapters ship with the crate:
//!
//! - [`OllamaEmbedder`] talks to a local Ollama server's embeddings API.
//! - [`HashedEmbedder`] derives deterministic vectors from token hashes, for
//!   tests and demos that must run without a model server.
//!
//! Providers return unit-length vectors so that cosine similarity reduces to
//! a dot product; the search engine still computes full cosine similarity and
//! does not depend on this.

pub mod hashed;
pub mod ollama;

use async_trait::async_trait;

use crate::types::MillError;

pub use hashed::HashedEmbedder;
pub use ollama::OllamaEmbedder;

/// A feature-extraction model behind an async boundary.
///
/// `dimensions()` is fixed for the provider's lifetime and must match the
/// collection it feeds. `init()` acquires model resources and is the one call
/// allowed to fail with [`MillError::ModelUnavailable`]; per-text failures
/// surface as [`MillError::Embedding`] and are recoverable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier used in logs and telemetry.
    fn id(&self) -> &str;

    /// Output dimensionality of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// Acquires model resources. Called once before a pipeline run or a
    /// search session touches the provider.
    async fn init(&self) -> Result<(), MillError> {
        Ok(())
    }

    /// Releases model resources.
    async fn dispose(&self) {}

    /// Embeds a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MillError>;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MillError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| MillError::Embedding("provider returned no vector".to_string()))
    }
}

/// Scales a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_produces_unit_length() {
        let mut vector = vec![3.0, 4.0];
        l2_normalize(&mut vector);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((vector[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_alone() {
        let mut vector = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut vector);
        assert_eq!(vector, vec![0.0, 0.0, 0.0]);
    }
}
