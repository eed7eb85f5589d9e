//! Data models shared across the pipeline.
//!
//! - [`ArticleDraft`]: a scraped blog entry before and after rewriting
//! - [`ProcessedRecord`]: one row of the duplicate-detection ledger
//! - [`GeneratedArtifact`]: a rendered article as listed in the manifest
//! - [`Manifest`]: the `articles.json` document written at the end of a run
//! - [`RunReport`]: counters and artifacts for one invocation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scraped blog entry.
///
/// Produced by the scraper, consumed and replaced by the rewrite step, and
/// dropped once the HTML document has been rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDraft {
    /// Headline as found on the page (or rewritten).
    pub title: String,
    /// Short teaser built from the first paragraph.
    pub description: String,
    /// Body text in the constrained markdown subset (`##` headings, `**bold**`).
    pub body: String,
    /// Absolute image URLs, shuffled; inline positions are not kept.
    pub images: Vec<String>,
    /// The entry URL this draft was scraped from.
    pub source_url: String,
    /// Byline attached to the rewritten article.
    pub author: String,
    pub tags: Vec<String>,
}

/// A ledger row. At most one record exists per URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub fingerprint: String,
    pub processed_at: String,
}

/// One of the two labels assigned by [`crate::categorize::categorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Automotive,
    Economy,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Automotive => "automotive",
            Category::Economy => "economy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered article as it appears in `articles.json` and `index.html`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub title: String,
    /// File name relative to the output directory.
    pub filename: String,
    pub tags: Vec<String>,
    /// Re-hosted thumbnail URL, empty when the article has no image.
    pub thumbnail: String,
    /// Source entry URL.
    pub url: String,
    pub category: Category,
    /// Whether the body came from the generation API rather than the manual transform.
    #[serde(default)]
    pub ai_rewritten: bool,
}

/// Summary block at the top of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMeta {
    pub total_articles: usize,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub generated_at: String,
    pub with_images: usize,
    /// Share of AI-rewritten artifacts, e.g. `"100%"`.
    pub ai_rewritten: String,
}

/// The `articles.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub meta: ManifestMeta,
    pub articles: Vec<GeneratedArtifact>,
}

impl Manifest {
    /// Build a manifest for the artifacts of one run.
    pub fn new(articles: Vec<GeneratedArtifact>, generated_at: String) -> Self {
        let total = articles.len();
        let with_images = articles.iter().filter(|a| !a.thumbnail.is_empty()).count();
        let rewritten = articles.iter().filter(|a| a.ai_rewritten).count();
        let share = if total == 0 { 0 } else { rewritten * 100 / total };
        Self {
            meta: ManifestMeta {
                total_articles: total,
                generated_at,
                with_images,
                ai_rewritten: format!("{share}%"),
            },
            articles,
        }
    }
}

/// Counters and artifacts produced by one run of the pipeline.
#[derive(Debug, Default)]
pub struct RunReport {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub artifacts: Vec<GeneratedArtifact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(thumbnail: &str, ai: bool) -> GeneratedArtifact {
        GeneratedArtifact {
            title: "제목".to_string(),
            filename: "title.html".to_string(),
            tags: vec!["뉴스".to_string()],
            thumbnail: thumbnail.to_string(),
            url: "https://blog.example.com/entry/1".to_string(),
            category: Category::Economy,
            ai_rewritten: ai,
        }
    }

    #[test]
    fn test_manifest_meta_counts() {
        let manifest = Manifest::new(
            vec![artifact("https://img/1", true), artifact("", true)],
            "2025-05-06 20:30:00".to_string(),
        );
        assert_eq!(manifest.meta.total_articles, 2);
        assert_eq!(manifest.meta.with_images, 1);
        assert_eq!(manifest.meta.ai_rewritten, "100%");
    }

    #[test]
    fn test_manifest_partial_ai_share() {
        let manifest = Manifest::new(
            vec![artifact("", true), artifact("", false)],
            "2025-05-06 20:30:00".to_string(),
        );
        assert_eq!(manifest.meta.ai_rewritten, "50%");
    }

    #[test]
    fn test_manifest_serialization_shape() {
        let manifest = Manifest::new(vec![artifact("", true)], "2025-05-06 08:00:00".to_string());
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["meta"]["total_articles"], 1);
        assert_eq!(json["meta"]["generated_at"], "2025-05-06 08:00:00");
        assert_eq!(json["articles"][0]["category"], "economy");
        assert_eq!(json["articles"][0]["filename"], "title.html");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Automotive.to_string(), "automotive");
        assert_eq!(Category::Economy.as_str(), "economy");
    }
}
