//! Runs a similarity query against a previously embedded collection.
//!
//! ```bash
//! cargo run --example query_corpus -- "how do we deploy to staging"
//! ```
//!
//! Reads the store written by the `corpus_pipeline` demo. Use the same
//! embedding configuration (`RAGMILL_OLLAMA_MODEL`, `RAGMILL_DIMENSIONS`)
//! that produced the collection, or scores will be meaningless.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use ragmill::embedding::{EmbeddingProvider, HashedEmbedder, OllamaEmbedder};
use ragmill::search::SearchEngine;
use ragmill::stores::{FsVectorStore, VectorStore};
use ragmill::types::MillError;

#[tokio::main]
async fn main() -> Result<(), MillError> {
    let query = env::args().nth(1).unwrap_or_else(|| "fruit basket".to_string());
    let store_dir = PathBuf::from(env::var("RAGMILL_STORE").unwrap_or_else(|_| "./ragmill_store".to_string()));
    let top_k = env::var("RAGMILL_TOP_K")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(SearchEngine::DEFAULT_TOP_K);

    let provider: Arc<dyn EmbeddingProvider> = match env::var("RAGMILL_OLLAMA_MODEL") {
        Ok(model) => {
            let dimensions = env::var("RAGMILL_DIMENSIONS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(384);
            Arc::new(OllamaEmbedder::local(model, dimensions)?)
        }
        Err(_) => Arc::new(HashedEmbedder::new()),
    };

    let store = Arc::new(FsVectorStore::new(&store_dir));
    match store.manifest().await? {
        Some(manifest) => println!(
            "Collection: {} records, {} dims\n",
            manifest.total, manifest.dimensions
        ),
        None => {
            println!("No collection at {}; run corpus_pipeline first.", store_dir.display());
            return Ok(());
        }
    }

    let engine = SearchEngine::new(provider, store);
    let results = engine.search(&query, top_k).await?;

    if results.is_empty() {
        println!("No results for '{query}'.");
        return Ok(());
    }

    println!("Top {} for '{query}':\n", results.len());
    println!("{:<7} | {:<24} | Preview", "Score", "Source");
    println!("{:-<7}-|-{:-<24}-|{:-<50}", "", "", "");
    for hit in &results {
        println!(
            "{:<7.4} | {:<24} | {}",
            hit.score,
            truncate(&hit.source_name, 24),
            truncate(&hit.text.replace('\n', " "), 60),
        );
    }
    println!();
    for hit in &results {
        println!("{} → {}", truncate(&hit.source_name, 24), hit.source_path);
    }

    Ok(())
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    format!("{cut}…")
}
