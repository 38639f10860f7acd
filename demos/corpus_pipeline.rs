//! Embeds a folder of Markdown files into a local vector collection.
//!
//! Configuration via environment variables, all optional:
//!
//! ```bash
//! RAGMILL_CORPUS=./corpus \
//! RAGMILL_STORE=./ragmill_store \
//! RAGMILL_RESUME=1 \
//! cargo run --example corpus_pipeline
//! ```
//!
//! Set `RAGMILL_OLLAMA_MODEL` (and optionally `RAGMILL_DIMENSIONS`) to embed
//! through a local Ollama server; without it the deterministic hashed
//! embedder is used so the demo runs offline.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::FmtSubscriber;

use ragmill::embedding::{EmbeddingProvider, HashedEmbedder, OllamaEmbedder};
use ragmill::ingestion::{
    CheckpointStore, DirectorySource, EmbeddingPipeline, PipelineEvent, RunOutcome,
};
use ragmill::stores::FsVectorStore;
use ragmill::types::MillError;

#[tokio::main]
async fn main() -> Result<(), MillError> {
    init_tracing();

    let corpus_dir = PathBuf::from(env::var("RAGMILL_CORPUS").unwrap_or_else(|_| "./corpus".to_string()));
    let store_dir = PathBuf::from(env::var("RAGMILL_STORE").unwrap_or_else(|_| "./ragmill_store".to_string()));
    let resume = env::var("RAGMILL_RESUME")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let provider: Arc<dyn EmbeddingProvider> = match env::var("RAGMILL_OLLAMA_MODEL") {
        Ok(model) => {
            let dimensions = env::var("RAGMILL_DIMENSIONS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(384);
            println!("Embedding with Ollama model '{model}' ({dimensions} dims)");
            Arc::new(OllamaEmbedder::local(model, dimensions)?)
        }
        Err(_) => {
            println!("Embedding with the offline hashed embedder");
            Arc::new(HashedEmbedder::new())
        }
    };

    let (sender, receiver) = flume::unbounded();
    let printer = tokio::spawn(async move {
        while let Ok(event) = receiver.recv_async().await {
            match event {
                PipelineEvent::Processing {
                    processed,
                    total,
                    last_id,
                } => {
                    let percent = (processed as f64 / total as f64) * 100.0;
                    println!("→ {processed}/{total} ({percent:.1}%) last={last_id}");
                }
                PipelineEvent::Skipped { id, reason } => {
                    println!("⏭︎ {id} skipped ({reason:?})");
                }
                PipelineEvent::ItemFailed { id, message } => {
                    println!("✗ {id} failed: {message}");
                }
                PipelineEvent::Completed { processed, total } => {
                    println!("✓ completed {processed}/{total}");
                }
                PipelineEvent::NothingToDo => println!("nothing to embed"),
                PipelineEvent::Failed { message } => println!("✗ run failed: {message}"),
            }
        }
    });

    let pipeline = EmbeddingPipeline::builder()
        .provider(provider)
        .store(Arc::new(FsVectorStore::new(&store_dir)))
        .checkpoints(CheckpointStore::new(store_dir.with_extension("progress.json")))
        .events(sender)
        .build();

    let source = DirectorySource::new(&corpus_dir);
    let start = Instant::now();
    let outcome = pipeline.run(&source, resume).await?;
    drop(pipeline);
    let _ = printer.await;

    match outcome {
        RunOutcome::Completed { processed, total } => {
            println!("\n✅ Ingestion complete!");
            println!("  documents processed : {processed}/{total}");
        }
        RunOutcome::Cancelled { processed, total } => {
            println!("\n⏸ Ingestion cancelled at {processed}/{total}; resume later with RAGMILL_RESUME=1");
        }
        RunOutcome::NothingToDo => {
            println!("\nNo Markdown documents found in {}", corpus_dir.display());
        }
    }
    println!("  store directory     : {}", store_dir.display());
    println!("  duration            : {:.2?}", start.elapsed());

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
