//! Sitemap indexing.
//!
//! Reads a `urlset` sitemap and keeps the `<loc>` values whose path contains
//! `/entry/`, which is where the blog host serves individual posts.

use crate::scrapers::PageSource;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::error::Error;
use tracing::{info, instrument, warn};

/// Path segment that marks an individual blog post.
pub const ENTRY_MARKER: &str = "/entry/";

/// Fetch the sitemap and return its entry URLs in document order.
#[instrument(level = "info", skip(source))]
pub async fn fetch_entry_urls<S: PageSource>(
    source: &S,
    sitemap_url: &str,
) -> Result<Vec<String>, Box<dyn Error>> {
    let xml = source.fetch_text(sitemap_url).await?;
    info!(bytes = xml.len(), "Downloaded sitemap");
    let urls = parse_entry_urls(&xml);
    info!(count = urls.len(), "Entry URLs in sitemap");
    Ok(urls)
}

/// Extract entry URLs from sitemap XML, keeping document order.
///
/// Malformed XML falls back to a line scan for `<loc>…</loc>` pairs.
pub fn parse_entry_urls(xml: &str) -> Vec<String> {
    let all = match parse_urlset(xml) {
        Ok(urls) => urls,
        Err(e) => {
            warn!(error = %e, "Sitemap XML did not parse; scanning lines for <loc>");
            scan_loc_lines(xml)
        }
    };
    all.into_iter()
        .filter(|url| url.contains(ENTRY_MARKER))
        .collect()
}

/// Parse a urlset XML and return all `<url><loc>` values.
fn parse_urlset(xml: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let mut reader = Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Event::Text(e) if in_loc => {
                let text = e.unescape()?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    urls.push(trimmed.to_string());
                }
            }
            Event::CData(e) if in_loc => {
                let text = String::from_utf8_lossy(&e.into_inner()).trim().to_string();
                if !text.is_empty() {
                    urls.push(text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(urls)
}

fn scan_loc_lines(xml: &str) -> Vec<String> {
    xml.lines()
        .filter_map(|line| {
            let start = line.find("<loc>")? + "<loc>".len();
            let end = line.find("</loc>")?;
            (end > start).then(|| line[start..end].trim().to_string())
        })
        .collect()
}
