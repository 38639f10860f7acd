//! Markdown to plain text, with frontmatter recovery.
//!
//! A leading `--- ... ---` block is split off before rendering and parsed as
//! flat `key: value` pairs; a `url` entry becomes the document's canonical
//! location. Malformed frontmatter is left in place and rendered as content.

use std::collections::BTreeMap;

use pulldown_cmark::{Event, Parser, TagEnd};

use crate::types::MillError;

use super::{NormalizedDocument, collapse_whitespace};

/// Renders Markdown to tag-free plain text.
pub fn markdown_to_text(raw: &str) -> Result<NormalizedDocument, MillError> {
    let (content, frontmatter) = split_frontmatter(raw);
    let source_url = frontmatter
        .as_ref()
        .and_then(|fields| fields.get("url").cloned());
    Ok(NormalizedDocument {
        text: render_plain(content),
        source_url,
    })
}

/// Splits a leading frontmatter block from Markdown content.
///
/// Returns the remaining content and the parsed `key: value` pairs. Input
/// without a complete block comes back untouched with no fields.
pub fn split_frontmatter(raw: &str) -> (&str, Option<BTreeMap<String, String>>) {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with("---") {
        return (raw, None);
    }
    let body = &trimmed[3..];
    let Some(end) = body.find("---") else {
        return (raw, None);
    };
    let content = &body[end + 3..];

    let mut fields = BTreeMap::new();
    for line in body[..end].lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let (key, value) = (key.trim(), value.trim());
            if !key.is_empty() && !value.is_empty() {
                fields.insert(key.to_string(), value.to_string());
            }
        }
    }
    let fields = (!fields.is_empty()).then_some(fields);
    (content, fields)
}

fn render_plain(content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for event in Parser::new(content) {
        match event {
            Event::Text(text) | Event::Code(text) => current.push_str(&text),
            Event::SoftBreak | Event::HardBreak => current.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote
                | TagEnd::TableRow,
            ) => {
                let line = collapse_whitespace(&current);
                current.clear();
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Event::End(TagEnd::TableCell) => current.push(' '),
            // Raw HTML embedded in the Markdown is dropped, not echoed.
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
    }
    let tail = collapse_whitespace(&current);
    if !tail.is_empty() {
        lines.push(tail);
    }
    lines.join("\n")
}
