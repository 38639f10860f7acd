//! Filesystem-backed vector store: one JSON file per record plus a manifest.
//!
//! Layout under the collection root:
//!
//! ```text
//! <root>/index.json     manifest {total, dimensions}
//! <root>/<id>.json      one EmbeddingRecord per embedded document
//! ```
//!
//! Every write goes to a `.tmp` sibling first and is renamed into place, so a
//! reader never observes a half-written record and an interrupted run leaves
//! at most an orphaned temp file behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::warn;

use crate::types::MillError;

use super::{CollectionManifest, EmbeddingRecord, VectorStore};

const MANIFEST_FILE: &str = "index.json";
const RECORD_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = "tmp";

/// Vector store rooted at a collection directory.
#[derive(Clone, Debug)]
pub struct FsVectorStore {
    root: PathBuf,
}

impl FsVectorStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the whole collection, records and manifest alike. Distinct
    /// from a checkpoint reset, which leaves records in place.
    pub async fn wipe(&self) -> Result<(), MillError> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    async fn write_atomic(&self, path: &Path, payload: &[u8]) -> Result<(), MillError> {
        fs::create_dir_all(&self.root).await?;
        let mut temp = path.as_os_str().to_owned();
        temp.push(".");
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);
        fs::write(&temp, payload).await?;
        fs::rename(&temp, path).await?;
        Ok(())
    }

    async fn read_record(
        &self,
        path: &Path,
        collection_dimensions: Option<usize>,
    ) -> Result<EmbeddingRecord, MillError> {
        let payload = fs::read_to_string(path).await?;
        let record: EmbeddingRecord = serde_json::from_str(&payload)?;
        record.validate(collection_dimensions)?;
        Ok(record)
    }

    fn is_record_file(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
            && path.file_name().and_then(|name| name.to_str()) != Some(MANIFEST_FILE)
    }
}

#[async_trait::async_trait]
impl VectorStore for FsVectorStore {
    async fn put(&self, record: &EmbeddingRecord) -> Result<(), MillError> {
        record.validate(None)?;
        let payload = serde_json::to_vec(record)?;
        self.write_atomic(&self.record_path(&record.id), &payload)
            .await
    }

    async fn manifest(&self) -> Result<Option<CollectionManifest>, MillError> {
        match fs::read_to_string(self.manifest_path()).await {
            Ok(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put_manifest(&self, manifest: &CollectionManifest) -> Result<(), MillError> {
        let payload = serde_json::to_vec(manifest)?;
        self.write_atomic(&self.manifest_path(), &payload).await
    }

    async fn list_all(&self) -> Result<Vec<EmbeddingRecord>, MillError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let collection_dimensions = match self.manifest().await {
            Ok(manifest) => manifest.map(|manifest| manifest.dimensions),
            Err(err) => {
                warn!(root = %self.root.display(), error = %err, "manifest unreadable, skipping dimension validation");
                None
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if Self::is_record_file(&path) {
                paths.push(path);
            }
        }
        // Directory order is platform-dependent; sort so iteration order (and
        // therefore tie-breaking in search) is reproducible.
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match self.read_record(&path, collection_dimensions).await {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable record");
                }
            }
        }
        Ok(records)
    }

    async fn contains(&self, id: &str) -> Result<bool, MillError> {
        Ok(fs::try_exists(self.record_path(id)).await?)
    }

    async fn last_modified(&self, id: &str) -> Result<Option<DateTime<Utc>>, MillError> {
        match fs::metadata(self.record_path(id)).await {
            Ok(metadata) => {
                let modified = metadata.modified()?;
                Ok(Some(DateTime::<Utc>::from(modified)))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn count(&self) -> Result<usize, MillError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if Self::is_record_file(&entry.path()) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::stable_record_id;
    use tempfile::tempdir;

    fn record(name: &str, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: stable_record_id(name),
            source_name: name.to_string(),
            source_path: format!("docs/{name}"),
            text: format!("contents of {name}"),
            dimensions: embedding.len(),
            embedding,
            embedded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_creates_container_and_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path().join("collection"));

        let original = record("a.md", vec![0.6, 0.8]);
        store.put(&original).await.unwrap();

        assert!(store.contains(&original.id).await.unwrap());
        assert!(store.last_modified(&original.id).await.unwrap().is_some());

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed, vec![original]);
    }

    #[tokio::test]
    async fn put_fully_replaces_prior_record() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path());

        let first = record("a.md", vec![1.0, 0.0]);
        store.put(&first).await.unwrap();

        let mut second = record("a.md", vec![0.0, 1.0]);
        second.text = "replaced".to_string();
        store.put(&second).await.unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "replaced");
        assert_eq!(listed[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn list_all_skips_corrupt_records() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path());
        store.put(&record("good.md", vec![1.0, 0.0])).await.unwrap();

        // A torn write from an interrupted run.
        std::fs::write(dir.path().join("deadbeef.json"), "{ not json").unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source_name, "good.md");
    }

    #[tokio::test]
    async fn list_all_rejects_records_disagreeing_with_manifest() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path());
        store
            .put_manifest(&CollectionManifest {
                total: 0,
                dimensions: 2,
            })
            .await
            .unwrap();
        store.put(&record("ok.md", vec![1.0, 0.0])).await.unwrap();
        store
            .put(&record("drifted.md", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source_name, "ok.md");
    }

    #[tokio::test]
    async fn missing_collection_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path().join("never-written"));
        assert!(store.manifest().await.unwrap().is_none());
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!store.contains("anything").await.unwrap());
        assert!(store.last_modified("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn manifest_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path());
        let manifest = CollectionManifest {
            total: 7,
            dimensions: 384,
        };
        store.put_manifest(&manifest).await.unwrap();
        assert_eq!(store.manifest().await.unwrap(), Some(manifest));
    }

    #[tokio::test]
    async fn wipe_removes_everything() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path().join("col"));
        store.put(&record("a.md", vec![1.0])).await.unwrap();
        store.wipe().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        // Wiping an absent collection is fine too.
        store.wipe().await.unwrap();
    }

    #[tokio::test]
    async fn temp_files_are_not_listed_or_counted() {
        let dir = tempdir().unwrap();
        let store = FsVectorStore::new(dir.path());
        store.put(&record("a.md", vec![1.0])).await.unwrap();
        std::fs::write(dir.path().join("pending.json.tmp"), "partial").unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
