//! Confluence storage-format markup to plain text.
//!
//! The storage format is XHTML with vendor elements (`ac:structured-macro`,
//! `ac:parameter`, ...). The walk emits a linear text stream: headings and
//! paragraphs on their own lines, table rows as pipe-delimited lines, and
//! structured macros reduced to their `title` parameter. Every text fragment
//! passes through a cleanup step that strips emoji shortcodes and symbols,
//! hex color codes, and isolated numeric tokens before whitespace collapse.

use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, node::Node};

use super::collapse_whitespace;

static EMOJI_SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[A-Za-z0-9_]+:").expect("valid shortcode pattern"));
static EMOJI_CODEPOINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b1[fF][0-9a-fA-F]{3}\b").expect("valid codepoint pattern"));
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[0-9A-Fa-f]{6}").expect("valid color pattern"));
static LONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("valid number pattern"));

/// Converts storage-format markup into a linear plain-text stream.
///
/// Empty or whitespace-only markup yields an empty string.
pub fn storage_to_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let document = Html::parse_document(raw);
    let mut lines: Vec<String> = Vec::new();
    let mut inline = String::new();
    walk(&document.tree.root(), &mut lines, &mut inline);
    flush_inline(&mut lines, &mut inline);
    lines.join("\n")
}

fn walk(node: &NodeRef<'_, Node>, lines: &mut Vec<String>, inline: &mut String) {
    match node.value() {
        Node::Text(text) => {
            push_inline(inline, &clean_fragment(text));
        }
        Node::Element(element) => match element.name() {
            "ac:structured-macro" => {
                if let Some(title) = macro_title(node) {
                    push_inline(inline, &title);
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" => {
                flush_inline(lines, inline);
                let text = clean_fragment(&subtree_text(node));
                if !text.is_empty() {
                    lines.push(text);
                }
            }
            "table" => {
                flush_inline(lines, inline);
                emit_table(node, lines);
            }
            _ => {
                for child in node.children() {
                    walk(&child, lines, inline);
                }
            }
        },
        _ => {
            for child in node.children() {
                walk(&child, lines, inline);
            }
        }
    }
}

/// The `title` parameter of a structured macro is the only content it
/// contributes; everything else inside the macro is configuration.
fn macro_title(node: &NodeRef<'_, Node>) -> Option<String> {
    for descendant in node.descendants() {
        if let Node::Element(element) = descendant.value() {
            if element.name() == "ac:parameter" && element.attr("ac:name") == Some("title") {
                let title = clean_fragment(&subtree_text(&descendant));
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }
    }
    None
}

fn emit_table(node: &NodeRef<'_, Node>, lines: &mut Vec<String>) {
    for descendant in node.descendants() {
        let Node::Element(element) = descendant.value() else {
            continue;
        };
        if element.name() != "tr" {
            continue;
        }
        let cells: Vec<String> = descendant
            .descendants()
            .filter(|cell| {
                matches!(cell.value(), Node::Element(el) if el.name() == "td" || el.name() == "th")
            })
            .map(|cell| clean_fragment(&subtree_text(&cell)))
            .filter(|text| !text.is_empty())
            .collect();
        if !cells.is_empty() {
            lines.push(format!("| {} |", cells.join(" | ")));
        }
    }
}

fn subtree_text(node: &NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        }
        _ => {
            for child in node.children() {
                collect_text(&child, out);
            }
        }
    }
}

fn push_inline(inline: &mut String, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    if !inline.is_empty() {
        inline.push(' ');
    }
    inline.push_str(fragment);
}

fn flush_inline(lines: &mut Vec<String>, inline: &mut String) {
    if !inline.is_empty() {
        lines.push(std::mem::take(inline));
    }
}

/// Cleanup applied to every text fragment before it reaches the output.
fn clean_fragment(input: &str) -> String {
    let pass = EMOJI_SHORTCODE.replace_all(input, "");
    let pass = EMOJI_CODEPOINT.replace_all(&pass, "");
    let pass = HEX_COLOR.replace_all(&pass, "");
    let pass = LONE_NUMBER.replace_all(&pass, "");
    let without_emoji: String = pass.chars().filter(|ch| !is_emoji_symbol(*ch)).collect();
    collapse_whitespace(&without_emoji)
}

fn is_emoji_symbol(ch: char) -> bool {
    matches!(ch as u32, 0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0xFE00..=0xFE0F)
}
