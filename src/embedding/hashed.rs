//! Deterministic hash-based embedder for tests and offline demos.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::types::MillError;

use super::{EmbeddingProvider, l2_normalize};

/// Embeds text by feature-hashing its word tokens into a fixed-width vector.
///
/// Identical inputs always produce identical vectors, and texts sharing
/// tokens land closer together under cosine similarity, so ranking tests
/// behave plausibly without a real model. Vectors are unit-normalized;
/// token-free input embeds to the zero vector.
#[derive(Clone, Debug)]
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    /// Default width matching the small sentence-transformer family.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new() -> Self {
        Self::with_dimensions(Self::DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let seed = hasher.finish();
            let slot = (seed as usize) % self.dimensions;
            let sign = if seed & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    fn id(&self) -> &str {
        "hashed"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MillError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(vector: &[f32]) -> f32 {
        vector.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let embedder = HashedEmbedder::with_dimensions(64);
        let inputs = vec!["hello world".to_string(), "hello world".to_string()];
        let vectors = embedder.embed_batch(&inputs).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn different_text_embeds_differently() {
        let embedder = HashedEmbedder::with_dimensions(64);
        let inputs = vec!["hello world".to_string(), "goodbye moon".to_string()];
        let vectors = embedder.embed_batch(&inputs).await.unwrap();
        assert_ne!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let embedder = HashedEmbedder::new();
        let vector = embedder.embed("some text worth embedding").await.unwrap();
        assert_eq!(vector.len(), HashedEmbedder::DEFAULT_DIMENSIONS);
        assert!((norm(&vector) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashedEmbedder::with_dimensions(16);
        let vector = embedder.embed("").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn token_overlap_raises_similarity() {
        let embedder = HashedEmbedder::with_dimensions(512);
        let a = embedder
            .embed("apple fruit sweet orchard harvest")
            .await
            .unwrap();
        let b = embedder.embed("fruit basket sweet harvest").await.unwrap();
        let c = embedder.embed("rocket ship engine thruster").await.unwrap();
        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
        assert!(dot(&a, &b) > 0.4);
        assert!(dot(&a, &b) > dot(&c, &b));
    }
}
