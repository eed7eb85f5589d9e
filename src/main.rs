//! # Entry Rewriter
//!
//! A content pipeline that reads a blog's sitemap, scrapes entry pages,
//! rewrites each article through an OpenAI-compatible chat API (or a
//! deterministic offline transform), re-hosts its images on Cloudflare
//! Images, and writes one self-contained HTML document per article plus a
//! JSON manifest and an index page.
//!
//! ## Features
//!
//! - Sitemap discovery of `/entry/` pages
//! - Scraping of Tistory-style entry pages (title, body, images)
//! - Title, body, tag and alt-text generation with validation and retries
//! - Offline "manual" rewriting when no API should be used
//! - Duplicate detection through a SQLite ledger and a scan of earlier output
//! - Keyword categorization into automotive and economy articles
//!
//! ## Usage
//!
//! ```sh
//! entry_rewriter https://example.tistory.com/sitemap.xml --limit 5
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: Read entry URLs from the sitemap
//! 2. **Selection**: Shuffle and cap the list
//! 3. **Processing**: Scrape, deduplicate, rewrite, re-host images, write HTML (one entry at a time)
//! 4. **Output**: Write `articles.json` and `index.html` for the run

use clap::Parser;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod categorize;
mod cli;
mod config;
mod error;
mod images;
mod ledger;
mod models;
mod outputs;
mod pipeline;
mod publish;
mod rewrite;
mod scrapers;
mod sitemap;
#[cfg(test)]
mod testing;
mod utils;

use api::OpenAiChat;
use cli::Cli;
use config::Config;
use images::CloudflareImages;
use ledger::Ledger;
use ledger::sqlite::SqliteLedger;
use pipeline::Pipeline;
use publish::LogPublisher;
use rewrite::Rewriter;
use scrapers::HttpSource;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("entry_rewriter starting up");

    let args = Cli::parse();
    let config = Config::from(args);
    debug!(
        sitemap = %config.sitemap_url,
        output_dir = %config.output_dir.display(),
        ledger = %config.ledger_path.display(),
        limit = config.limit,
        shuffle = config.shuffle,
        manual = config.manual_rewrite,
        "Resolved configuration"
    );

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Discover entries ----
    let sitemap_source = HttpSource::new(Duration::from_secs(30))?;
    let entry_urls = match sitemap::fetch_entry_urls(&sitemap_source, &config.sitemap_url).await {
        Ok(urls) => urls,
        Err(e) => {
            error!(url = %config.sitemap_url, error = %e, "Could not read sitemap");
            return Err(e);
        }
    };
    if entry_urls.is_empty() {
        warn!(url = %config.sitemap_url, "Sitemap lists no entries; nothing to do");
        return Ok(());
    }

    // ---- Collaborators ----
    let page_source = HttpSource::new(Duration::from_secs(15))?;
    let store = SqliteLedger::open(&config.ledger_path)?;
    info!(path = %store.path().display(), "Ledger ready");

    let chat = match (&config.openai_api_key, config.manual_rewrite) {
        (_, true) => {
            info!("Manual rewrite mode; the generation API will not be called");
            None
        }
        (Some(key), false) => Some(OpenAiChat::new(
            config.openai_base_url.clone(),
            key.clone(),
            config.model.clone(),
        )?),
        (None, false) => {
            warn!("No API key configured; entries will fail unless --manual-rewrite is set");
            None
        }
    };

    let image_host = match &config.image_host {
        Some(host) => Some(CloudflareImages::new(
            host.api_token.clone(),
            host.account_id.clone(),
            host.account_hash.clone(),
        )?),
        None => {
            info!("No Cloudflare credentials; articles will be written without images");
            None
        }
    };

    let rewriter = Rewriter::from_config(chat, &config);
    let pipeline = Pipeline::new(
        config,
        Ledger::new(store),
        page_source,
        rewriter,
        image_host,
        LogPublisher,
    );

    // ---- Run ----
    let report = pipeline.run(&entry_urls).await;

    let ledger_size = pipeline
        .ledger()
        .len()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "Processed {} / skipped {} / failed {} of {} entries ({} in ledger)",
        report.processed, report.skipped, report.failed, report.total, ledger_size
    );

    let elapsed = start_time.elapsed();
    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        total = report.total,
        elapsed_secs = elapsed.as_secs_f64(),
        "Run complete"
    );
    println!("Execution time: {:.2?}", elapsed);

    Ok(())
}
