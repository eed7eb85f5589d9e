//! Blog entry scraper.
//!
//! Extracts the title, body text and images from an entry page of a
//! Tistory-style blog. Title and body are taken from the first selector in a
//! priority list that matches. Advertisement blocks are skipped, images are
//! pulled out of the text into a separate shuffled list, and sub-headings are
//! normalized to `## ` markdown headings.

use crate::error::ItemError;
use crate::models::ArticleDraft;
use crate::scrapers::PageSource;
use once_cell::sync::Lazy;
use rand::rng;
use rand::seq::SliceRandom;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// Title candidates, most specific first.
const TITLE_SELECTORS: &[&str] = &["h1.title_post", "h1.post-title", ".title_post", "h1", "title"];

/// Body container candidates, most specific first.
const BODY_SELECTORS: &[&str] = &[
    "div.entry-content",
    ".article_view",
    ".post-content",
    ".contents_style",
    ".post_ct",
];

/// Title used when the page has none.
pub const UNTITLED: &str = "제목 없음";

/// Tags every scraped entry starts with.
pub const DEFAULT_TAGS: [&str; 2] = ["뉴스", "이슈"];

const DESCRIPTION_CHARS: usize = 150;

static AD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "script, style, ins.adsbygoogle, .revenue_unit_wrap, .google-auto-placed, div[data-tistory-react-app]",
    )
    .expect("valid selector")
});
static MEDIA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img, figure").expect("valid selector"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("valid selector"));

static CAPTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"\[이미지.*?\]", r"\(사진.*?\)", r"사진=.*", r"이미지=.*"]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Fetch an entry page and extract a draft from it.
#[instrument(level = "info", skip(source, author))]
pub async fn fetch_draft<S: PageSource>(
    source: &S,
    url: &str,
    author: &str,
) -> Result<ArticleDraft, ItemError> {
    let html = source
        .fetch_text(url)
        .await
        .map_err(|e| ItemError::Fetch(e.to_string()))?;
    let draft = extract_draft(&html, url, author)?;
    info!(
        title = %draft.title,
        body_chars = draft.body.chars().count(),
        images = draft.images.len(),
        "Parsed entry"
    );
    Ok(draft)
}

/// Extract an [`ArticleDraft`] from an entry page.
///
/// Fails when none of the body container selectors match.
pub fn extract_draft(html: &str, url: &str, author: &str) -> Result<ArticleDraft, ItemError> {
    let document = Html::parse_document(html);

    let title = first_match(&document, TITLE_SELECTORS)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let content = first_match(&document, BODY_SELECTORS)
        .ok_or_else(|| ItemError::Scrape(format!("no content container found at {url}")))?;

    let mut images = collect_images(content, url);
    images.shuffle(&mut rng());

    let paragraphs = collect_paragraphs(content);
    let description = paragraphs
        .first()
        .map(|p| describe(p))
        .unwrap_or_default();
    debug!(paragraphs = paragraphs.len(), "Collected paragraphs");

    Ok(ArticleDraft {
        title,
        description,
        body: paragraphs.join("\n\n"),
        images,
        source_url: url.to_string(),
        author: author.to_string(),
        tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
    })
}

fn first_match<'a>(document: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next())
}

fn inside_ad(el: ElementRef<'_>) -> bool {
    AD_SELECTOR.matches(&el)
        || el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| AD_SELECTOR.matches(&a))
}

/// Absolute URLs of every image in the container, outside advertisement blocks.
fn collect_images(content: ElementRef<'_>, page_url: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    content
        .select(&IMG_SELECTOR)
        .filter(|img| !inside_ad(*img))
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| {
            let src = src.trim();
            if src.is_empty() {
                return None;
            }
            match &base {
                Some(base) => base.join(src).ok().map(|u| u.to_string()),
                None => Some(src.to_string()),
            }
        })
        .collect()
}

/// Text blocks of the container as markdown paragraphs and `## ` headings.
fn collect_paragraphs(content: ElementRef<'_>) -> Vec<String> {
    let mut paragraphs = Vec::new();
    for child in content.children().filter_map(ElementRef::wrap) {
        let name = child.value().name();
        if !matches!(name, "p" | "h1" | "h2" | "h3" | "h4" | "h5") || AD_SELECTOR.matches(&child) {
            continue;
        }

        let mut text = String::new();
        visible_text(child, &mut text);
        let mut text = text.trim().to_string();
        for pattern in CAPTION_PATTERNS.iter() {
            text = pattern.replace_all(&text, "").into_owned();
        }
        let text = text.trim();
        if text.is_empty() || text.starts_with("(adsbygoogle") {
            continue;
        }

        if name == "h1" || name == "p" {
            paragraphs.push(text.to_string());
        } else {
            let heading: String = text
                .chars()
                .filter(|c| !matches!(c, ':' | '!' | '?' | '|'))
                .collect();
            paragraphs.push(format!("\n## {}\n", heading.trim()));
        }
    }
    paragraphs
}

/// Append the text of `el` to `out`, skipping images, figures and ad blocks,
/// and turning `<br>` into a newline.
fn visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() == "br" {
                out.push('\n');
            } else if !MEDIA_SELECTOR.matches(&child_el) && !AD_SELECTOR.matches(&child_el) {
                visible_text(child_el, out);
            }
        }
    }
}

/// Short teaser: first characters of a paragraph on one line, with `"` escaped.
fn describe(paragraph: &str) -> String {
    let head: String = paragraph.chars().take(DESCRIPTION_CHARS).collect();
    let head = format!("{head}...").replace('"', "&quot;");
    WHITESPACE.replace_all(&head, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    const PAGE: &str = r#"<html><head><title>Site title</title></head><body>
<h1 class="title_post">  전기차 시장의 변화  </h1>
<div class="entry-content">
  <p>첫 문단입니다. <img src="/img/a.jpg">"인용" 포함</p>
  <ins class="adsbygoogle">AD TEXT</ins>
  <div data-tistory-react-app="x"><p>react ad</p><img src="https://ads.example.com/ad.png"></div>
  <h3>주요 변화: 무엇이 달라졌나?</h3>
  <p>둘째 줄<br>셋째 줄</p>
  <p>사진=연합뉴스</p>
  <p><figure><img src="//cdn.example.com/b.png"><figcaption>캡션</figcaption></figure></p>
  <p>(adsbygoogle = window.adsbygoogle || []).push({});</p>
  <p>본문 [이미지 1] 계속 (사진 제공) 끝</p>
  <script>var x = 1;</script>
</div>
</body></html>"#;

    const URL: &str = "https://blog.example.com/entry/post-1";

    #[test]
    fn test_title_prefers_specific_selector() {
        let draft = extract_draft(PAGE, URL, "author").unwrap();
        assert_eq!(draft.title, "전기차 시장의 변화");
    }

    #[test]
    fn test_title_falls_back_to_title_tag_then_placeholder() {
        let html = r#"<html><head><title>Only title</title></head><body><div class="post_ct"><p>x</p></div></body></html>"#;
        assert_eq!(extract_draft(html, URL, "a").unwrap().title, "Only title");

        let html = r#"<html><body><div class="post_ct"><p>x</p></div></body></html>"#;
        assert_eq!(extract_draft(html, URL, "a").unwrap().title, UNTITLED);
    }

    #[test]
    fn test_body_text_strips_images_ads_and_captions() {
        let draft = extract_draft(PAGE, URL, "author").unwrap();
        assert!(draft.body.contains("첫 문단입니다. \"인용\" 포함"));
        assert!(draft.body.contains("\n## 주요 변화 무엇이 달라졌나\n"));
        assert!(draft.body.contains("둘째 줄\n셋째 줄"));
        assert!(draft.body.contains("본문  계속  끝"));
        assert!(!draft.body.contains("AD TEXT"));
        assert!(!draft.body.contains("react ad"));
        assert!(!draft.body.contains("연합뉴스"));
        assert!(!draft.body.contains("adsbygoogle"));
        assert!(!draft.body.contains("캡션"));
        assert!(!draft.body.contains("var x"));
    }

    #[test]
    fn test_images_are_absolute_and_exclude_ads() {
        let draft = extract_draft(PAGE, URL, "author").unwrap();
        let mut images = draft.images.clone();
        images.sort();
        assert_eq!(
            images,
            vec![
                "https://blog.example.com/img/a.jpg",
                "https://cdn.example.com/b.png",
            ]
        );
    }

    #[test]
    fn test_description_and_defaults() {
        let draft = extract_draft(PAGE, URL, "윤신애").unwrap();
        assert_eq!(draft.description, "첫 문단입니다. &quot;인용&quot; 포함...");
        assert_eq!(draft.author, "윤신애");
        assert_eq!(draft.tags, vec!["뉴스", "이슈"]);
        assert_eq!(draft.source_url, URL);
    }

    #[test]
    fn test_body_container_priority() {
        let html = r#"<html><body>
<div class="post-content"><p>second choice</p></div>
<div class="article_view"><p>first choice</p></div>
</body></html>"#;
        let draft = extract_draft(html, URL, "a").unwrap();
        assert_eq!(draft.body, "first choice");
    }

    #[test]
    fn test_missing_container_is_an_error() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(matches!(extract_draft(html, URL, "a"), Err(ItemError::Scrape(_))));
    }

    #[tokio::test]
    async fn test_fetch_draft_maps_fetch_failure() {
        let source = FakeSource::new();
        let err = fetch_draft(&source, URL, "a").await.unwrap_err();
        assert!(matches!(err, ItemError::Fetch(_)));
    }
}
