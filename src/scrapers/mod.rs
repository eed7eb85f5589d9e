//! Page fetching and blog entry extraction.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing**: [`crate::sitemap`] lists entry URLs from the sitemap
//! 2. **Fetching**: [`entry`] downloads one entry and extracts an
//!    [`crate::models::ArticleDraft`]
//!
//! All network access goes through the [`PageSource`] trait so the pipeline
//! can run against canned pages in tests.

pub mod entry;

use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument};

/// Browser-like user agent; some blog hosts refuse the default reqwest one.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Anything that can return the body of a URL as text.
pub trait PageSource {
    async fn fetch_text(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

impl<T: PageSource> PageSource for &T {
    async fn fetch_text(&self, url: &str) -> Result<String, Box<dyn Error>> {
        (**self).fetch_text(url).await
    }
}

/// [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
