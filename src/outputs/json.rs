//! JSON manifest output.
//!
//! The manifest lists every article produced in a run so a static front end
//! can load it without parsing HTML:
//!
//! ```text
//! output_dir/
//! └── articles.json
//! ```
//!
//! The file is replaced on every run that produced at least one article.

use crate::models::Manifest;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const MANIFEST_FILE: &str = "articles.json";

/// Write a [`Manifest`] as pretty-printed JSON to `{output_dir}/articles.json`.
///
/// Non-ASCII text is written as-is, not escaped.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_manifest(manifest: &Manifest, output_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(manifest)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = output_dir.join(MANIFEST_FILE);
    info!(path = %path.display(), articles = manifest.meta.total_articles, "Writing manifest");
    fs::write(&path, json).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, GeneratedArtifact};

    #[tokio::test]
    async fn test_manifest_round_trips_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::new(
            vec![GeneratedArtifact {
                title: "금리 동결".to_string(),
                filename: "금리-동결.html".to_string(),
                tags: vec!["경제".to_string()],
                thumbnail: "https://img.test/1".to_string(),
                url: "https://blog.test/entry/1".to_string(),
                category: Category::Economy,
                ai_rewritten: true,
            }],
            "2025-05-06 09:00:00".to_string(),
        );

        let path = write_manifest(&manifest, dir.path()).await.unwrap();
        assert!(path.ends_with(MANIFEST_FILE));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"title\": \"금리 동결\""));
        assert!(text.contains("\"category\": \"economy\""));
        assert!(text.contains("\"ai_rewritten\": \"100%\""));

        let parsed: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, manifest);
    }
}
