//! The small markdown subset used in article bodies, and its HTML form.
//!
//! Supported: `##### ` and `## ` headings at line start, `**bold**`,
//! `![alt](src)` images. Blocks are separated by blank lines; a block that
//! does not already start with a tag is wrapped in `<p>`. Inline HTML such as
//! `<br>` passes through untouched.

use crate::utils::escape_html;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static H5: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##### (.+)$").expect("valid regex"));
static H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.+)$").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"));
static LEADING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<[^>]+>").expect("valid regex"));
static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^## [^\n]+$").expect("valid regex"));

const IMAGE_STYLE: &str = "max-width:100%;height:auto;margin:20px 0;";

/// An image placed in the body after a section heading.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub src: String,
    pub alt: String,
}

/// `<img>` tag for a hosted image.
pub fn image_tag(src: &str, alt: &str) -> String {
    format!(
        "<img src=\"{}\" alt=\"{}\" style=\"{IMAGE_STYLE}\">",
        escape_html(src),
        escape_html(alt)
    )
}

/// Convert the markdown subset to HTML blocks joined by blank lines.
pub fn markdown_to_html(markdown: &str) -> String {
    let html = H5.replace_all(markdown, "<h5>$1</h5>");
    let html = H2.replace_all(&html, "<h2>$1</h2>");
    let html = BOLD.replace_all(&html, "<strong>$1</strong>");
    let html = IMAGE.replace_all(&html, |caps: &Captures| image_tag(&caps[2], &caps[1]));

    html.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            if LEADING_TAG.is_match(block) {
                block.to_string()
            } else {
                format!("<p>{block}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// For every `## ` heading, the text an image placed after it would illustrate:
/// the next non-heading block, or the heading itself when none follows.
pub fn section_leads(markdown: &str) -> Vec<String> {
    let blocks: Vec<&str> = markdown
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect();

    let mut leads = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        for heading in block.lines().filter(|l| HEADING_LINE.is_match(l)) {
            let following = blocks[i + 1..]
                .iter()
                .find(|b| !b.starts_with('#'))
                .copied()
                .unwrap_or(heading.trim_start_matches("## "));
            leads.push(following.to_string());
        }
    }
    leads
}

/// Insert one image after each `## ` heading, in order, until images run out.
pub fn insert_images(markdown: &str, images: &[InlineImage]) -> String {
    let mut remaining = images.iter();
    HEADING_LINE
        .replace_all(markdown, |caps: &Captures| match remaining.next() {
            Some(image) => format!("{}\n\n{}\n", &caps[0], image_tag(&image.src, &image.alt)),
            None => caps[0].to_string(),
        })
        .into_owned()
}
