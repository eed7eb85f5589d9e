//! Hand-off of finished articles to a publishing target.
//!
//! The pipeline calls [`Publisher::submit`] once per written article,
//! after the ledger has been updated. A failed submission is logged and does
//! not fail the article; the HTML file on disk is the artifact that counts.
//!
//! # Implementations
//!
//! | Type | Behavior |
//! |------|----------|
//! | [`LogPublisher`] | Logs the submission and succeeds. The default. |
//!
//! A blog or CMS poster implements the same trait and replaces
//! [`LogPublisher`] where the pipeline is built in `main`.

use crate::models::GeneratedArtifact;
use std::error::Error;
use std::path::Path;
use tracing::info;

/// A target that accepts finished articles.
pub trait Publisher {
    /// Submit one rendered article.
    ///
    /// * `artifact` - manifest entry of the article
    /// * `document` - path of the rendered HTML file
    async fn submit(&self, artifact: &GeneratedArtifact, document: &Path) -> Result<(), Box<dyn Error>>;
}

impl<T: Publisher> Publisher for &T {
    async fn submit(&self, artifact: &GeneratedArtifact, document: &Path) -> Result<(), Box<dyn Error>> {
        (**self).submit(artifact, document).await
    }
}

/// Publisher that only records the submission in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    async fn submit(&self, artifact: &GeneratedArtifact, document: &Path) -> Result<(), Box<dyn Error>> {
        info!(
            title = %artifact.title,
            category = %artifact.category,
            path = %document.display(),
            "Article ready for publishing"
        );
        Ok(())
    }
}
