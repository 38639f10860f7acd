//! Embedding adapter for a local Ollama server.
//!
//! Speaks the `POST /api/embeddings` contract: `{"model", "prompt"}` in,
//! `{"embedding": [...]}` out. Returned vectors are L2-normalized before
//! they leave the adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::MillError;

use super::{EmbeddingProvider, l2_normalize};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Provider backed by an Ollama instance, typically on localhost.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";

    /// Creates an embedder against `base_url`, e.g. `http://localhost:11434`.
    ///
    /// `dimensions` must match what `model` actually produces; every response
    /// is validated against it.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, MillError> {
        let endpoint = Url::parse(base_url)
            .and_then(|url| url.join("/api/embeddings"))
            .map_err(|err| MillError::ModelUnavailable(format!("invalid endpoint: {err}")))?;
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|err| MillError::ModelUnavailable(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            dimensions,
        })
    }

    /// Embedder against the default local Ollama endpoint.
    pub fn local(model: impl Into<String>, dimensions: usize) -> Result<Self, MillError> {
        Self::new(Self::DEFAULT_BASE_URL, model, dimensions)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MillError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|err| MillError::Embedding(err.to_string()))?
            .error_for_status()
            .map_err(|err| MillError::Embedding(err.to_string()))?;
        let payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| MillError::Embedding(format!("invalid embedding response: {err}")))?;
        if payload.embedding.len() != self.dimensions {
            return Err(MillError::DimensionMismatch {
                expected: self.dimensions,
                actual: payload.embedding.len(),
            });
        }
        let mut vector = payload.embedding;
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Probes the server with a throwaway prompt so a missing model or dead
    /// server fails the run up front instead of on the first document.
    async fn init(&self) -> Result<(), MillError> {
        match self.embed_one("ping").await {
            Ok(_) => Ok(()),
            Err(err @ MillError::DimensionMismatch { .. }) => Err(err),
            Err(err) => Err(MillError::ModelUnavailable(err.to_string())),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MillError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn embeds_and_normalizes_against_mock_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embeddings")
                    .json_body_partial(r#"{"model": "all-minilm"}"#);
                then.status(200)
                    .json_body(serde_json::json!({"embedding": [3.0, 4.0]}));
            })
            .await;

        let embedder = OllamaEmbedder::new(&server.base_url(), "all-minilm", 2).unwrap();
        let vector = embedder.embed("hello").await.unwrap();
        mock.assert_async().await;
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(200)
                    .json_body(serde_json::json!({"embedding": [1.0, 2.0, 3.0]}));
            })
            .await;

        let embedder = OllamaEmbedder::new(&server.base_url(), "all-minilm", 2).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, MillError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_model_unavailable() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "all-minilm", 2).unwrap();
        let err = embedder.init().await.unwrap_err();
        assert!(matches!(err, MillError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn server_error_is_recoverable_embedding_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embeddings");
                then.status(500);
            })
            .await;

        let embedder = OllamaEmbedder::new(&server.base_url(), "all-minilm", 2).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, MillError::Embedding(_)));
    }
}
