//! Frontmatter parsing for source documents.
//!
//! Every document under `pages/` starts with a delimited metadata block:
//!
//! ```text
//! ---
//! title: Braised Leeks
//! template: recipe
//! featured: true
//! ---
//!
//! Body markdown starts here.
//! ```
//!
//! The block is a line of three hyphens, one `key: value` line per metadata
//! entry, and a closing line of three hyphens. Keys the builder understands:
//! `title`, `draft`, `template`, `featured`, `subtitle`, `order`. Unknown
//! keys are preserved and passed through to the page template verbatim.
//!
//! A malformed block — no opening delimiter, no closing delimiter, or a
//! metadata line without a `key: value` separator — aborts the whole build
//! with an error naming the file. Bad metadata is an authoring mistake the
//! user must see, not a condition to paper over per file.
//!
//! ## Content hash
//!
//! [`Document::content_hash`] is a SHA-256 digest of the body, computed once
//! at parse time. It is a stable identity for the document's content and is
//! deliberately *not* consulted by the staleness check in
//! [`freshness`](crate::freshness) — rebuild decisions are mtime-only.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frontmatter must start with '---': {0}")]
    MissingOpenDelimiter(PathBuf),
    #[error("Frontmatter has no closing '---': {0}")]
    MissingCloseDelimiter(PathBuf),
    #[error("Frontmatter line {1:?} has no 'key: value' separator: {0}")]
    MalformedEntry(PathBuf, String),
}

/// A parsed source document: metadata, raw markup body, and content identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Metadata entries from the header block, in key order.
    pub frontmatter: BTreeMap<String, String>,
    /// Raw markup body (everything after the closing delimiter).
    pub body: String,
    /// SHA-256 hex digest of `body`, computed at parse time.
    pub content_hash: String,
}

impl Document {
    fn new(frontmatter: BTreeMap<String, String>, body: String) -> Self {
        let content_hash = format!("{:x}", Sha256::digest(body.as_bytes()));
        Self {
            frontmatter,
            body,
            content_hash,
        }
    }

    /// Frontmatter `title`, or the `"Untitled"` sentinel when absent.
    pub fn title(&self) -> &str {
        self.frontmatter
            .get("title")
            .map(String::as_str)
            .unwrap_or("Untitled")
    }

    /// Template logical name from frontmatter, defaulting to `page`.
    pub fn template(&self) -> &str {
        self.frontmatter
            .get("template")
            .map(String::as_str)
            .unwrap_or("page")
    }

    /// Whether the document is marked as a draft (case-insensitive "true").
    pub fn is_draft(&self) -> bool {
        self.flag("draft")
    }

    /// Whether the document is flagged for homepage/index highlighting.
    pub fn is_featured(&self) -> bool {
        self.flag("featured")
    }

    /// Explicit sort key from the optional `order` entry. Defaults to 0;
    /// non-numeric values also fall back to 0.
    pub fn order(&self) -> i64 {
        self.frontmatter
            .get("order")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    fn flag(&self, key: &str) -> bool {
        self.frontmatter
            .get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// Parse a document file into a [`Document`].
///
/// Errors identify `path` so a failing build names the offending file.
pub fn parse_file(path: &Path) -> Result<Document, FrontmatterError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text, path)
}

/// Parse document text. `path` is used only for error reporting.
pub fn parse(text: &str, path: &Path) -> Result<Document, FrontmatterError> {
    let mut lines = text.lines();

    match lines.next() {
        Some(line) if line.trim() == "---" => {}
        _ => return Err(FrontmatterError::MissingOpenDelimiter(path.to_path_buf())),
    }

    let mut frontmatter = BTreeMap::new();
    let mut closed = false;
    let mut body_lines: Vec<&str> = Vec::new();

    for line in lines {
        if !closed {
            if line.trim() == "---" {
                closed = true;
                continue;
            }
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }
            let (key, value) = entry.split_once(": ").ok_or_else(|| {
                FrontmatterError::MalformedEntry(path.to_path_buf(), entry.to_string())
            })?;
            frontmatter.insert(key.to_string(), value.to_string());
        } else {
            body_lines.push(line);
        }
    }

    if !closed {
        return Err(FrontmatterError::MissingCloseDelimiter(path.to_path_buf()));
    }

    // The closing delimiter is conventionally followed by one blank line
    // that belongs to the header, not the body.
    if body_lines.first().is_some_and(|l| l.trim().is_empty()) {
        body_lines.remove(0);
    }

    Ok(Document::new(frontmatter, body_lines.join("\n")))
}
