//! Durable progress tracking for resumable ingestion runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::types::MillError;

/// How far a pipeline run has advanced over its source set.
///
/// Invariants: `processed_count <= total_count` once the total is known, and
/// `is_complete` implies the counts are equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCheckpoint {
    pub processed_count: usize,
    pub total_count: usize,
    /// Record id of the most recently processed document.
    pub last_processed_id: Option<String>,
    pub is_complete: bool,
}

/// Persists a [`ProgressCheckpoint`] as a small JSON file, outside the vector
/// store container.
///
/// `save` is called after every processed item, so writes go through a temp
/// file and a rename; a process killed mid-save leaves the previous
/// checkpoint intact.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted checkpoint, if any. An unreadable checkpoint is
    /// treated as absent so a damaged file cannot wedge future runs.
    pub async fn load(&self) -> Result<Option<ProgressCheckpoint>, MillError> {
        let payload = match fs::read_to_string(&self.path).await {
            Ok(payload) => payload,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&payload) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding unreadable checkpoint");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, checkpoint: &ProgressCheckpoint) -> Result<(), MillError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut temp = self.path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, serde_json::to_vec(checkpoint)?).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    /// Clears progress bookkeeping. Vector store records are untouched.
    pub async fn reset(&self) -> Result<(), MillError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn checkpoint_round_trips() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state").join("progress.json"));
        assert!(store.load().await.unwrap().is_none());

        let checkpoint = ProgressCheckpoint {
            processed_count: 6,
            total_count: 10,
            last_processed_id: Some("abcd".to_string()),
            is_complete: false,
        };
        store.save(&checkpoint).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(checkpoint));
    }

    #[tokio::test]
    async fn reset_clears_state() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("progress.json"));
        store.save(&ProgressCheckpoint::default()).await.unwrap();
        store.reset().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Resetting twice is fine.
        store.reset().await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_checkpoint_reads_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ torn write").unwrap();
        let store = CheckpointStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_previous_state() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("progress.json"));
        for processed in 1..=3usize {
            store
                .save(&ProgressCheckpoint {
                    processed_count: processed,
                    total_count: 3,
                    last_processed_id: Some(format!("id-{processed}")),
                    is_complete: processed == 3,
                })
                .await
                .unwrap();
        }
        let last = store.load().await.unwrap().unwrap();
        assert_eq!(last.processed_count, 3);
        assert!(last.is_complete);
    }
}
