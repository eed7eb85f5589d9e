//! Utility functions for string manipulation and file system operations.
//!
//! - String truncation for logging
//! - Output file naming (slug, collision suffix)
//! - HTML escaping for template substitution
//! - File system validation for the output directory

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SLUG_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Longest slug used for an output file name, in characters.
pub const MAX_SLUG_CHARS: usize = 50;

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and the number
/// of dropped characters appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Convert a title into a file-name slug.
///
/// Characters that are neither word characters, whitespace nor hyphens are
/// removed, runs of whitespace and hyphens collapse into one hyphen, and the
/// result is capped at [`MAX_SLUG_CHARS`] characters. Non-ASCII letters are
/// kept.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello,  World!"), "Hello-World");
/// ```
pub fn slugify_title(title: &str) -> String {
    let cleaned = NON_SLUG_CHARS.replace_all(title, "");
    let joined = SLUG_SEPARATORS.replace_all(&cleaned, "-");
    let trimmed = joined.trim_matches('-');
    let capped: String = trimmed.chars().take(MAX_SLUG_CHARS).collect();
    let capped = capped.trim_end_matches('-');
    if capped.is_empty() {
        "article".to_string()
    } else {
        capped.to_string()
    }
}

/// Pick a free `<slug>.html` path in `dir`, appending `-1`, `-2`, … on collision.
pub fn unique_output_path(dir: &Path, slug: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{slug}.html"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{slug}-{counter}.html"));
        counter += 1;
    }
    candidate
}

/// Escape text for safe inclusion in HTML element content or a quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
