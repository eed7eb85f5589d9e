//! Self-contained HTML document for one rewritten article.
//!
//! The document starts with the duplicate-detection marker block (see
//! [`crate::ledger::scan`]), followed by the page itself: title, thumbnail,
//! body, tags, a link to the source entry, and two buttons that copy the body
//! HTML to the clipboard or download the page.

use crate::ledger::scan::marker_block;
use crate::outputs::markup::{InlineImage, image_tag, insert_images, markdown_to_html};
use crate::utils::{escape_html, slugify_title, unique_output_path};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const STYLE: &str = r#"        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; line-height: 1.6; }
        h1 { color: #333; border-bottom: 2px solid #007acc; padding-bottom: 10px; }
        h2 { color: #555; margin-top: 30px; }
        h5 { background: #f8f9fa; padding: 15px; border-left: 4px solid #007acc; margin: 20px 0; }
        .tags { background: #f1f3f4; padding: 10px; border-radius: 5px; margin: 20px 0; }
        .tag { display: inline-block; background: #007acc; color: white; padding: 3px 8px; margin: 2px; border-radius: 3px; font-size: 12px; }
        .original-url { color: #666; font-size: 12px; margin-top: 20px; }
        .copy-btn { background: #007acc; color: white; border: none; padding: 10px 20px; border-radius: 5px; cursor: pointer; margin: 10px 5px 0 0; }
        .copy-btn:hover { background: #005a9e; }"#;

/// Everything needed to render one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticlePage {
    pub title: String,
    /// Body in the markdown subset.
    pub body: String,
    pub tags: Vec<String>,
    pub source_url: String,
    /// Title as scraped; the output scanner compares new entries against it.
    pub source_title: String,
    /// Teaser for the description meta tag, with `"` already as `&quot;`.
    pub description: String,
    pub author: String,
    pub fingerprint: String,
    pub thumbnail: Option<String>,
    /// Images placed after successive `## ` headings.
    pub inline_images: Vec<InlineImage>,
}

/// Escape text for a JavaScript template literal.
fn js_template_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

/// Escape text for a single-quoted JavaScript string.
fn js_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render the full HTML document.
pub fn render_article(page: &ArticlePage) -> Result<String, std::fmt::Error> {
    let body = insert_images(&page.body, &page.inline_images);
    let content = markdown_to_html(&body);
    let title = escape_html(&page.title);
    let download_name = js_string(&escape_html(&page.title.replace(' ', "_")));

    let mut html = String::new();
    writeln!(
        html,
        "{}",
        marker_block(&page.source_url, &page.fingerprint, &page.source_title)
    )?;
    writeln!(html, "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>")?;
    writeln!(html, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        html,
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(
        html,
        "    <meta name=\"description\" content=\"{}\">",
        escape_html(&page.description.replace("&quot;", "\""))
    )?;
    writeln!(
        html,
        "    <meta name=\"author\" content=\"{}\">",
        escape_html(&page.author)
    )?;
    writeln!(html, "    <title>{title}</title>")?;
    writeln!(html, "    <style>\n{STYLE}\n    </style>\n</head>\n<body>")?;
    writeln!(html, "    <h1>{title}</h1>")?;

    if let Some(thumbnail) = &page.thumbnail {
        writeln!(html, "    {}", image_tag(thumbnail, "썸네일"))?;
    }

    writeln!(html, "    <div class=\"content\">\n{content}\n    </div>")?;

    writeln!(html, "    <div class=\"tags\">\n        <strong>태그:</strong>")?;
    let tags = page
        .tags
        .iter()
        .map(|t| format!("<span class=\"tag\">{}</span>", escape_html(t)))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(html, "        {tags}\n    </div>")?;

    let source = escape_html(&page.source_url);
    writeln!(
        html,
        "    <div class=\"original-url\">\n        <strong>원본 URL:</strong> <a href=\"{source}\" target=\"_blank\">{source}</a>\n    </div>"
    )?;

    writeln!(
        html,
        "    <button class=\"copy-btn\" onclick=\"copyContent()\">티스토리용 HTML 복사</button>"
    )?;
    writeln!(
        html,
        "    <button class=\"copy-btn\" onclick=\"downloadHtml()\">HTML 파일 다운로드</button>"
    )?;

    writeln!(html, "    <script>")?;
    writeln!(html, "        function copyContent() {{")?;
    writeln!(
        html,
        "            const content = `{}`;",
        js_template_literal(&content)
    )?;
    writeln!(
        html,
        "            navigator.clipboard.writeText(content).then(() => {{ alert('티스토리용 HTML이 클립보드에 복사되었습니다!'); }});"
    )?;
    writeln!(html, "        }}")?;
    writeln!(html, "        function downloadHtml() {{")?;
    writeln!(
        html,
        "            const blob = new Blob([document.documentElement.outerHTML], {{ type: 'text/html' }});"
    )?;
    writeln!(html, "            const url = URL.createObjectURL(blob);")?;
    writeln!(html, "            const a = document.createElement('a');")?;
    writeln!(html, "            a.href = url;")?;
    writeln!(html, "            a.download = '{download_name}.html';")?;
    writeln!(
        html,
        "            document.body.appendChild(a);\n            a.click();\n            document.body.removeChild(a);\n            URL.revokeObjectURL(url);"
    )?;
    writeln!(html, "        }}\n    </script>\n</body>\n</html>")?;
    Ok(html)
}

/// Render `page` and write it to a new file in `output_dir` named after the title.
///
/// Existing files are never overwritten; a `-N` suffix is added instead.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), title = %page.title))]
pub async fn write_article(page: &ArticlePage, output_dir: &Path) -> Result<PathBuf, std::io::Error> {
    let html = render_article(page).map_err(std::io::Error::other)?;
    fs::create_dir_all(output_dir).await?;
    let path = unique_output_path(output_dir, &slugify_title(&page.title));
    fs::write(&path, html).await?;
    info!(path = %path.display(), "Wrote article");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::scan::OutputScanner;

    fn page() -> ArticlePage {
        ArticlePage {
            title: "전기차 \"충전\" 전쟁".to_string(),
            body: "##### **요약**<br>**부제**\n\n도입 `코드` ${x}\n\n## 시장 반응\n\n본문".to_string(),
            tags: vec!["뉴스".to_string(), "<b>".to_string()],
            source_url: "https://blog.test/entry/ev".to_string(),
            source_title: "충전 전쟁".to_string(),
            description: "도입 &quot;요약&quot;...".to_string(),
            author: "윤신애".to_string(),
            fingerprint: "abcd1234".to_string(),
            thumbnail: Some("https://img.test/thumb".to_string()),
            inline_images: vec![InlineImage {
                src: "https://img.test/inline".to_string(),
                alt: "충전소".to_string(),
            }],
        }
    }

    #[test]
    fn test_document_starts_with_markers() {
        let html = render_article(&page()).unwrap();
        assert!(html.starts_with(
            "<!--\nsource_url: \"https://blog.test/entry/ev\"\nhash: abcd1234\ntitle: \"충전 전쟁\"\n-->"
        ));
        assert!(html.contains("<title>전기차 &quot;충전&quot; 전쟁</title>"));
        assert!(html.contains("<meta name=\"author\" content=\"윤신애\">"));
        assert!(html.contains("<meta name=\"description\" content=\"도입 &quot;요약&quot;...\">"));
    }

    #[test]
    fn test_document_sections() {
        let html = render_article(&page()).unwrap();
        assert!(html.contains("alt=\"썸네일\""));
        assert!(html.contains("<h2>시장 반응</h2>"));
        assert!(html.contains("alt=\"충전소\""));
        assert!(html.contains("<span class=\"tag\">뉴스</span> <span class=\"tag\">&lt;b&gt;</span>"));
        assert!(html.contains("<a href=\"https://blog.test/entry/ev\" target=\"_blank\">"));
        assert!(html.contains("function copyContent()"));
        assert!(html.contains("a.download = '전기차_&quot;충전&quot;_전쟁.html';"));
    }

    #[test]
    fn test_script_literal_is_escaped() {
        let html = render_article(&page()).unwrap();
        assert!(html.contains("도입 \\`코드\\` \\${x}"));
    }

    #[test]
    fn test_without_thumbnail() {
        let mut page = page();
        page.thumbnail = None;
        let html = render_article(&page).unwrap();
        assert!(!html.contains("썸네일"));
    }

    #[tokio::test]
    async fn test_write_never_overwrites_and_is_found_by_scanner() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_article(&page(), dir.path()).await.unwrap();
        let second = write_article(&page(), dir.path()).await.unwrap();
        assert_eq!(first.file_name().unwrap(), "전기차-충전-전쟁.html");
        assert_eq!(second.file_name().unwrap(), "전기차-충전-전쟁-1.html");

        let scanner = OutputScanner::new(dir.path());
        assert!(scanner.find_duplicate("https://blog.test/entry/ev", "00000000", "x").is_some());
    }
}
