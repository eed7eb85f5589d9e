//! Run configuration injected into the pipeline.
//!
//! Built once from the parsed [`Cli`]; nothing downstream reads the process
//! environment or global state.

use crate::api::RetryPolicy;
use crate::cli::Cli;
use std::path::PathBuf;
use std::time::Duration;

/// Sleeps inserted between external calls to stay under rate limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Lower bound of the random pause between two entries.
    pub between_items_min: Duration,
    /// Upper bound of the random pause between two entries.
    pub between_items_max: Duration,
    /// A longer pause is taken after every this many processed entries.
    pub long_pause_every: usize,
    pub long_pause: Duration,
    /// Pause between two image uploads.
    pub between_uploads: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_items_min: Duration::from_secs(1),
            between_items_max: Duration::from_secs(2),
            long_pause_every: 10,
            long_pause: Duration::from_secs(5),
            between_uploads: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No sleeping at all.
    pub fn none() -> Self {
        Self {
            between_items_min: Duration::ZERO,
            between_items_max: Duration::ZERO,
            long_pause_every: 10,
            long_pause: Duration::ZERO,
            between_uploads: Duration::ZERO,
        }
    }
}

/// Credentials and fixed identifiers for Cloudflare Images.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHostConfig {
    pub api_token: String,
    pub account_id: String,
    pub account_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub sitemap_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    /// `None` disables image upload.
    pub image_host: Option<ImageHostConfig>,
    pub output_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub limit: usize,
    pub shuffle: bool,
    pub manual_rewrite: bool,
    pub public_base_url: String,
    pub author: String,
    /// At most this many images are re-hosted per article.
    pub max_images: usize,
    pub pacing: Pacing,
    pub title_retry: RetryPolicy,
    pub body_retry: RetryPolicy,
    pub tag_retry: RetryPolicy,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let image_host = cli
            .cloudflare_api_token
            .filter(|t| !t.trim().is_empty())
            .map(|api_token| ImageHostConfig {
                api_token,
                account_id: cli.cloudflare_account_id,
                account_hash: cli.cloudflare_account_hash,
            });
        Self {
            sitemap_url: cli.sitemap_url,
            openai_api_key: cli.openai_api_key.filter(|k| !k.trim().is_empty()),
            openai_base_url: cli.openai_base_url,
            model: cli.model,
            image_host,
            output_dir: cli.output_dir,
            ledger_path: cli.ledger,
            limit: cli.limit,
            shuffle: !cli.in_order,
            manual_rewrite: cli.manual_rewrite,
            public_base_url: cli.public_base_url.trim_end_matches('/').to_string(),
            author: cli.author,
            max_images: 5,
            pacing: Pacing::default(),
            title_retry: RetryPolicy::new(3, Duration::ZERO),
            body_retry: RetryPolicy::fixed(3, Duration::from_secs(2)),
            tag_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_blank_credentials_are_treated_as_missing() {
        let cli = Cli::parse_from([
            "entry_rewriter",
            "--openai-api-key",
            " ",
            "--cloudflare-api-token",
            "",
            "--in-order",
        ]);
        let config = Config::from(cli);
        assert!(config.openai_api_key.is_none());
        assert!(config.image_host.is_none());
        assert!(!config.shuffle);
    }

    #[test]
    fn test_image_host_uses_account_constants() {
        let cli = Cli::parse_from([
            "entry_rewriter",
            "--cloudflare-api-token",
            "token",
            "--cloudflare-account-id",
            "acct",
            "--cloudflare-account-hash",
            "hash",
        ]);
        let config = Config::from(cli);
        let host = config.image_host.unwrap();
        assert_eq!(host.api_token, "token");
        assert_eq!(host.account_id, "acct");
        assert_eq!(host.account_hash, "hash");
        assert_eq!(config.max_images, 5);
    }

    #[test]
    fn test_body_and_tag_retries_wait_a_fixed_time() {
        let config = Config::from(Cli::parse_from(["entry_rewriter"]));
        assert_eq!(config.body_retry.max_attempts, 3);
        assert_eq!(config.body_retry.delay_after(1), Duration::from_secs(2));
        assert_eq!(config.body_retry.delay_after(2), Duration::from_secs(2));
        assert_eq!(config.tag_retry.delay_after(2), Duration::from_secs(1));
        assert_eq!(config.title_retry.delay_after(1), Duration::ZERO);
    }
}
