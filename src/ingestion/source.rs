//! Document source boundary.
//!
//! Fetching, pagination, and authentication belong to external collaborators;
//! the pipeline only needs a finite enumeration of documents with stable
//! names and modification times. [`DirectorySource`] covers the common local
//! case of a folder of Markdown files.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::warn;

use crate::normalize::DocumentFormat;
use crate::types::MillError;

/// One document as handed to the pipeline.
#[derive(Clone, Debug)]
pub struct SourceDocument {
    /// Stable name (filename or page title); record ids derive from it.
    pub name: String,
    /// Logical location for citation (URL or file path).
    pub location: String,
    pub raw_content: String,
    pub format: DocumentFormat,
    pub last_modified: DateTime<Utc>,
}

/// A finite, enumerable set of source documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Label for logs and progress reporting.
    fn describe(&self) -> String;

    /// Enumerates the full document set in a deterministic order.
    ///
    /// Failure here is systemic (the source root itself is unreadable) and
    /// aborts the run; unreadable individual documents should be skipped and
    /// logged by the implementation instead.
    async fn enumerate(&self) -> Result<Vec<SourceDocument>, MillError>;
}

/// Enumerates the Markdown files of one directory, sorted by file name.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn enumerate(&self) -> Result<Vec<SourceDocument>, MillError> {
        let mut entries =
            fs::read_dir(&self.root)
                .await
                .map_err(|err| MillError::SourceUnreadable {
                    name: self.describe(),
                    reason: err.to_string(),
                })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| MillError::SourceUnreadable {
                name: self.describe(),
                reason: err.to_string(),
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("md") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let raw_content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable document");
                    continue;
                }
            };
            let last_modified = match fs::metadata(&path).await.and_then(|meta| meta.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping document without mtime");
                    continue;
                }
            };
            documents.push(SourceDocument {
                name,
                location: path.display().to_string(),
                raw_content,
                format: DocumentFormat::Markdown,
                last_modified,
            });
        }
        Ok(documents)
    }
}
