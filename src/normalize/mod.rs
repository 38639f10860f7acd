//! Converts raw document markup into clean plain text for embedding.
//!
//! Two markup families are handled: Confluence-style XHTML storage format
//! ([`storage`]) and Markdown with optional frontmatter ([`markdown`]).
//! Empty or whitespace-only input yields an empty string, never an error;
//! whether the result is worth embedding is the pipeline's call.

pub mod markdown;
pub mod storage;

use serde::{Deserialize, Serialize};

use crate::types::MillError;

pub use markdown::split_frontmatter;
pub use storage::storage_to_text;

/// Markup family of a source document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Confluence-style XHTML storage markup.
    Storage,
    /// Markdown, optionally carrying a `--- ... ---` frontmatter block.
    Markdown,
    /// Already-plain text; only whitespace is normalized.
    PlainText,
}

/// Result of normalizing one document: the embeddable text plus any metadata
/// recovered from the markup itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedDocument {
    pub text: String,
    /// Canonical URL recovered from Markdown frontmatter, when present.
    pub source_url: Option<String>,
}

/// Converts raw markup into plain text suitable for embedding.
pub fn normalize(format: DocumentFormat, raw: &str) -> Result<NormalizedDocument, MillError> {
    match format {
        DocumentFormat::Storage => Ok(NormalizedDocument {
            text: storage::storage_to_text(raw),
            source_url: None,
        }),
        DocumentFormat::Markdown => markdown::markdown_to_text(raw),
        DocumentFormat::PlainText => Ok(NormalizedDocument {
            text: collapse_whitespace(raw),
            source_url: None,
        }),
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub(crate) fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}
