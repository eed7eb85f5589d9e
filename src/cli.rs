//! Command-line interface definitions.
//!
//! Every option can be given as a flag or through the environment, so the
//! tool runs unchanged from a shell or a scheduled CI job.

use clap::Parser;
use std::path::PathBuf;

/// Rewrite blog entries listed in a sitemap and publish them as static HTML.
///
/// # Examples
///
/// ```sh
/// # Process one random entry with the API key from the environment
/// OPENAI_API_KEY=sk-... entry_rewriter
///
/// # Process the first five entries of another sitemap, in document order
/// entry_rewriter https://blog.example.com/sitemap.xml --limit 5 --in-order
///
/// # Skip the generation API and use the local text transform
/// entry_rewriter --manual-rewrite
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Sitemap to read entry URLs from
    #[arg(
        env = "SITEMAP_URL",
        default_value = "https://difks2004.tistory.com/sitemap.xml"
    )]
    pub sitemap_url: String,

    /// API key for the OpenAI-compatible generation API
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the generation API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Model used for every generation call
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4.1")]
    pub model: String,

    /// Cloudflare Images API token; image upload is skipped without it
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: Option<String>,

    /// Cloudflare account the images are uploaded to
    #[arg(
        long,
        env = "CLOUDFLARE_ACCOUNT_ID",
        default_value = "5778a7b9867a82c2c6ad6d104d5ebb6d"
    )]
    pub cloudflare_account_id: String,

    /// Account hash used in imagedelivery.net URLs
    #[arg(
        long,
        env = "CLOUDFLARE_ACCOUNT_HASH",
        default_value = "BhPWbivJAhTvor9c-8lV2w"
    )]
    pub cloudflare_account_hash: String,

    /// Directory receiving the HTML documents, articles.json and index.html
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// SQLite ledger of already processed entries
    #[arg(long, env = "LEDGER_PATH", default_value = "processed_articles.db")]
    pub ledger: PathBuf,

    /// Number of entries to process in this run
    #[arg(long, default_value_t = 1)]
    pub limit: usize,

    /// Take entries in sitemap order instead of a random selection
    #[arg(long)]
    pub in_order: bool,

    /// Rewrite bodies with the local text transform instead of the API
    #[arg(long)]
    pub manual_rewrite: bool,

    /// Public site the generated pages are served from (used by index.html)
    #[arg(
        long,
        env = "PUBLIC_BASE_URL",
        default_value = "https://12345-82w.pages.dev"
    )]
    pub public_base_url: String,

    /// Byline attached to rewritten articles
    #[arg(long, env = "ARTICLE_AUTHOR", default_value = "윤신애")]
    pub author: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["entry_rewriter"]).unwrap();
        assert_eq!(cli.limit, 1);
        assert!(!cli.in_order);
        assert!(!cli.manual_rewrite);
    }

    #[test]
    fn test_cli_positional_sitemap_and_flags() {
        let cli = Cli::parse_from([
            "entry_rewriter",
            "https://blog.example.com/sitemap.xml",
            "--limit",
            "5",
            "--in-order",
            "-o",
            "/tmp/out",
        ]);
        assert_eq!(cli.sitemap_url, "https://blog.example.com/sitemap.xml");
        assert_eq!(cli.limit, 5);
        assert!(cli.in_order);
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
    }
}
