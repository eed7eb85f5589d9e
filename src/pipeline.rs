//! The per-run processing loop.
//!
//! For every selected entry URL:
//!
//! 1. skip it when the ledger already holds the URL (no fetch)
//! 2. scrape the page into an [`ArticleDraft`](crate::models::ArticleDraft)
//! 3. skip it when the ledger holds the URL or fingerprint, or a document in
//!    the output directory already covers it
//! 4. rewrite title, body and tags; pick a category
//! 5. re-host up to `max_images` images
//! 6. render and write the HTML document, record the entry in the ledger
//! 7. hand the article to the [`Publisher`]
//!
//! Entries are processed one at a time. A failing entry is counted and the
//! loop moves on. When at least one article was written, the manifest and
//! the index page are written at the end.

use crate::api::AskAsync;
use crate::categorize::categorize;
use crate::config::{Config, Pacing};
use crate::error::ItemError;
use crate::images::{ImageHost, upload_images};
use crate::ledger::scan::{OutputScanner, ScanHit};
use crate::ledger::{Ledger, LedgerStore, fingerprint};
use crate::models::{GeneratedArtifact, Manifest, RunReport};
use crate::outputs::article::{ArticlePage, write_article};
use crate::outputs::markup::{InlineImage, section_leads};
use crate::outputs::{indexes, json};
use crate::publish::Publisher;
use crate::rewrite::Rewriter;
use crate::scrapers::PageSource;
use crate::scrapers::entry::fetch_draft;
use chrono::Local;
use rand::seq::SliceRandom;
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Why an entry was not processed again.
#[derive(Debug)]
pub enum SkipReason {
    /// The URL was in the ledger before the page was fetched.
    KnownUrl,
    /// The ledger matched the URL or the fingerprint after scraping.
    Ledger,
    /// A document in the output directory already covers the entry.
    Output(ScanHit),
}

#[derive(Debug)]
pub enum ItemOutcome {
    Written(GeneratedArtifact),
    Skipped(SkipReason),
}

/// The entries handled in one run: all of them, or the first `limit`
/// (after shuffling when `shuffle` is set). A limit of 0 means no limit.
pub fn select_urls(urls: &[String], limit: usize, shuffle: bool) -> Vec<String> {
    let mut selected = urls.to_vec();
    if shuffle {
        selected.shuffle(&mut rng());
    }
    if limit > 0 {
        selected.truncate(limit);
    }
    selected
}

fn is_long_pause(pacing: &Pacing, processed: usize, just_written: bool) -> bool {
    just_written && pacing.long_pause_every > 0 && processed % pacing.long_pause_every == 0
}

/// How long to wait before the next entry.
///
/// Every `long_pause_every`-th written article earns the long pause; any other
/// item waits a random time between the two bounds.
fn pause_delay(pacing: &Pacing, processed: usize, just_written: bool) -> Duration {
    if is_long_pause(pacing, processed, just_written) {
        pacing.long_pause
    } else if pacing.between_items_max > pacing.between_items_min {
        rng().random_range(pacing.between_items_min..=pacing.between_items_max)
    } else {
        pacing.between_items_min
    }
}

async fn pause(pacing: &Pacing, processed: usize, just_written: bool) {
    if is_long_pause(pacing, processed, just_written) {
        info!(processed, "Taking a longer break");
    }
    let delay = pause_delay(pacing, processed, just_written);
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

pub struct Pipeline<L, S, A, H, P> {
    config: Config,
    ledger: Ledger<L>,
    scanner: OutputScanner,
    source: S,
    rewriter: Rewriter<A>,
    images: Option<H>,
    publisher: P,
}

impl<L, S, A, H, P> Pipeline<L, S, A, H, P>
where
    L: LedgerStore,
    S: PageSource,
    A: AskAsync<Response = String>,
    H: ImageHost,
    P: Publisher,
{
    pub fn new(
        config: Config,
        ledger: Ledger<L>,
        source: S,
        rewriter: Rewriter<A>,
        images: Option<H>,
        publisher: P,
    ) -> Self {
        let scanner = OutputScanner::new(config.output_dir.clone());
        Self {
            config,
            ledger,
            scanner,
            source,
            rewriter,
            images,
            publisher,
        }
    }

    pub fn ledger(&self) -> &Ledger<L> {
        &self.ledger
    }

    /// Process the selected entries and write the run's manifest and index.
    pub async fn run(&self, entry_urls: &[String]) -> RunReport {
        let selected = select_urls(entry_urls, self.config.limit, self.config.shuffle);
        let mut report = RunReport {
            total: selected.len(),
            ..RunReport::default()
        };
        info!(
            available = entry_urls.len(),
            selected = selected.len(),
            "Starting run"
        );

        for (i, url) in selected.iter().enumerate() {
            info!(item = i + 1, of = selected.len(), %url, "Processing entry");
            let mut just_written = false;
            match self.process(url).await {
                Ok(ItemOutcome::Written(artifact)) => {
                    report.processed += 1;
                    report.artifacts.push(artifact);
                    just_written = true;
                }
                Ok(ItemOutcome::Skipped(reason)) => {
                    info!(%url, ?reason, "Skipping already processed entry");
                    report.skipped += 1;
                }
                Err(e) => {
                    error!(%url, error = %e, "Entry failed");
                    report.failed += 1;
                }
            }
            info!(
                processed = report.processed,
                skipped = report.skipped,
                failed = report.failed,
                "Progress"
            );

            if i + 1 < selected.len() {
                pause(&self.config.pacing, report.processed, just_written).await;
            }
        }

        if !report.artifacts.is_empty() {
            self.write_listing(&report.artifacts).await;
        }
        report
    }

    #[instrument(level = "info", skip(self))]
    async fn process(&self, url: &str) -> Result<ItemOutcome, ItemError> {
        if self.ledger.seen_url(url) {
            if let Some(record) = self.ledger.record_for(url) {
                info!(
                    id = record.id,
                    ledger_url = %record.url,
                    hash = %record.fingerprint,
                    processed_at = %record.processed_at,
                    title = %record.title,
                    "Entry already in ledger"
                );
            }
            return Ok(ItemOutcome::Skipped(SkipReason::KnownUrl));
        }

        let draft = fetch_draft(&self.source, url, &self.config.author).await?;
        let fp = fingerprint(&draft.title, url);
        if self.ledger.is_processed(url, &fp) {
            return Ok(ItemOutcome::Skipped(SkipReason::Ledger));
        }
        if let Some(hit) = self.scanner.find_duplicate(url, &fp, &draft.title) {
            info!(path = %hit.path().display(), "Entry already present in output directory");
            return Ok(ItemOutcome::Skipped(SkipReason::Output(hit)));
        }

        let title = self
            .rewriter
            .rewrite_title(&draft.title, &draft.body)
            .await
            .into_title();
        let body = self.rewriter.rewrite_body(&title, &draft.body).await?;
        let tags = self.rewriter.generate_tags(&title, &body, &draft.tags).await;
        let category = categorize(&title, &body, &tags);
        info!(%title, %category, ?tags, "Article rewritten");

        let hosted = match &self.images {
            Some(host) if !draft.images.is_empty() => {
                upload_images(
                    host,
                    &draft.images,
                    self.config.max_images,
                    self.config.pacing.between_uploads,
                )
                .await
            }
            _ => Vec::new(),
        };
        let inline_images = self
            .inline_images(&title, &body, hosted.get(1..).unwrap_or_default())
            .await;
        let thumbnail = hosted.first().cloned();

        let page = ArticlePage {
            title: title.clone(),
            body,
            tags: tags.clone(),
            source_url: draft.source_url.clone(),
            source_title: draft.title.clone(),
            description: draft.description.clone(),
            author: draft.author.clone(),
            fingerprint: fp.clone(),
            thumbnail: thumbnail.clone(),
            inline_images,
        };
        let written = write_article(&page, &self.config.output_dir).await;
        self.ledger.mark_processed(url, &title, &fp);
        let path = written?;

        let artifact = GeneratedArtifact {
            title,
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tags,
            thumbnail: thumbnail.unwrap_or_default(),
            url: url.to_string(),
            category,
            ai_rewritten: !self.rewriter.is_manual(),
        };

        if let Err(e) = self.publisher.submit(&artifact, &path).await {
            warn!(error = %e, "Publisher rejected article; keeping the local copy");
        }
        Ok(ItemOutcome::Written(artifact))
    }

    /// One image per `## ` section, with alt text generated from the section's lead.
    async fn inline_images(&self, title: &str, body: &str, hosted: &[String]) -> Vec<InlineImage> {
        let mut placed = Vec::new();
        for (src, lead) in hosted.iter().zip(section_leads(body)) {
            let alt = self.rewriter.generate_alt_text(&lead, title).await;
            placed.push(InlineImage {
                src: src.clone(),
                alt,
            });
        }
        placed
    }

    async fn write_listing(&self, artifacts: &[GeneratedArtifact]) {
        let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let manifest = Manifest::new(artifacts.to_vec(), generated_at);

        if let Err(e) = json::write_manifest(&manifest, &self.config.output_dir).await {
            error!(error = %e, "Failed to write manifest");
        }
        if let Err(e) =
            indexes::write_index(&manifest, &self.config.output_dir, &self.config.public_base_url).await
        {
            error!(error = %e, "Failed to write index page");
        }
    }
}
