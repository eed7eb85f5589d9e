//! Duplicate check over the output directory.
//!
//! Every rendered document starts with a marker block:
//!
//! ```text
//! <!--
//! source_url: "https://blog.example.com/entry/post"
//! hash: 1a2b3c4d
//! title: "Rewritten title"
//! -->
//! ```
//!
//! The scanner walks the output directory (subdirectories included) and
//! reports a duplicate when a document carries the same URL marker, the same
//! fingerprint marker, or a title whose word set is nearly identical to the
//! candidate's. It works without the ledger, so it still catches repeats when
//! the ledger file was lost or reset.

use crate::utils::escape_html;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Titles whose similarity is strictly above this are the same article.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

static TITLE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"title: "([^"]+)""#).expect("valid regex"));
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// The marker block embedded at the top of a rendered document.
pub fn marker_block(url: &str, fingerprint: &str, title: &str) -> String {
    format!(
        "<!--\nsource_url: \"{}\"\nhash: {}\ntitle: \"{}\"\n-->",
        escape_html(url),
        fingerprint,
        escape_html(title)
    )
}

/// Which marker matched.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanHit {
    Url(PathBuf),
    Fingerprint(PathBuf),
    SimilarTitle { path: PathBuf, similarity: f64 },
}

impl ScanHit {
    pub fn path(&self) -> &Path {
        match self {
            ScanHit::Url(p) | ScanHit::Fingerprint(p) => p,
            ScanHit::SimilarTitle { path, .. } => path,
        }
    }
}

/// Lowercased word set of a title with punctuation removed.
pub fn normalized_words(title: &str) -> HashSet<String> {
    let lower = title.to_lowercase();
    NON_WORD
        .replace_all(&lower, "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the normalized word sets; 0.0 when either is empty.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalized_words(a);
    let b = normalized_words(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    shared as f64 / union as f64
}

fn unescape_marker(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Scans previously written documents for an entry.
#[derive(Debug, Clone)]
pub struct OutputScanner {
    root: PathBuf,
}

impl OutputScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// First document that marks this entry as already written, if any.
    ///
    /// A missing output directory means no duplicate. Unreadable files are skipped.
    #[instrument(level = "debug", skip(self, title))]
    pub fn find_duplicate(&self, url: &str, fingerprint: &str, title: &str) -> Option<ScanHit> {
        let url_marker = format!("source_url: \"{}\"", escape_html(url));
        let hash_marker = format!("hash: {fingerprint}");

        for path in self.documents() {
            let Ok(content) = fs::read_to_string(&path) else {
                debug!(path = %path.display(), "Skipping unreadable file");
                continue;
            };
            if content.contains(&url_marker) {
                return Some(ScanHit::Url(path));
            }
            if content.contains(&hash_marker) {
                return Some(ScanHit::Fingerprint(path));
            }
            if let Some(existing) = TITLE_MARKER.captures(&content).and_then(|c| c.get(1)) {
                let similarity = title_similarity(title, &unescape_marker(existing.as_str()));
                if similarity > TITLE_SIMILARITY_THRESHOLD {
                    return Some(ScanHit::SimilarTitle { path, similarity });
                }
            }
        }
        None
    }

    /// `.html` and `.md` files under the root, depth first.
    fn documents(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("html") | Some("md")
                ) {
                    found.push(path);
                }
            }
        }
        found.sort();
        found
    }
}
