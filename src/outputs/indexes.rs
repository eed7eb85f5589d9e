//! Index page listing the articles of a run.
//!
//! `index.html` shows a stats block (total articles, articles with images,
//! share rewritten through the generation API) followed by one card per
//! article: thumbnail, title linked under the public base URL, the first three
//! tags and the category.

use crate::models::Manifest;
use crate::utils::escape_html;
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const INDEX_FILE: &str = "index.html";

const STYLE: &str = r#"        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f8f9fa; color: #333; line-height: 1.6; }
        .header { background: linear-gradient(135deg, #007acc 0%, #005a9e 100%); color: white; padding: 40px 20px; text-align: center; }
        .container { max-width: 1200px; margin: 0 auto; padding: 40px 20px; }
        .stats { display: flex; justify-content: center; gap: 40px; margin-bottom: 40px; flex-wrap: wrap; }
        .stat-card { background: white; padding: 20px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); text-align: center; min-width: 150px; }
        .stat-number { font-size: 2rem; font-weight: bold; color: #007acc; }
        .stat-label { color: #666; margin-top: 5px; }
        .articles-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(400px, 1fr)); gap: 20px; }
        .article-card { background: white; border-radius: 12px; box-shadow: 0 4px 15px rgba(0,0,0,0.1); overflow: hidden; display: flex; }
        .article-thumbnail { flex-shrink: 0; width: 200px; height: 120px; background: #f1f3f4; }
        .article-thumbnail img { width: 200px; height: 120px; object-fit: cover; }
        .article-info { padding: 20px; flex: 1; }
        .article-info h3 a { color: #333; text-decoration: none; }
        .tag, .category { display: inline-block; background: #e9f4ff; color: #007acc; padding: 3px 8px; margin: 2px; border-radius: 4px; font-size: 11px; }
        .category { background: #007acc; color: white; }
        .btn-view, .btn-copy { padding: 8px 16px; border: none; border-radius: 6px; cursor: pointer; font-size: 12px; text-decoration: none; }
        .btn-view { background: #007acc; color: white; }
        .btn-copy { background: #f1f3f4; color: #333; }
        @media (max-width: 768px) { .articles-grid { grid-template-columns: 1fr; } .article-card { flex-direction: column; } }"#;

/// Render `index.html` for a manifest. Links point at `{public_base_url}/{filename}`.
pub fn render_index(manifest: &Manifest, public_base_url: &str) -> Result<String, std::fmt::Error> {
    let base = public_base_url.trim_end_matches('/');
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>")?;
    writeln!(html, "    <meta charset=\"UTF-8\">")?;
    writeln!(
        html,
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(html, "    <title>AI 재작성 글 목록</title>")?;
    writeln!(html, "    <style>\n{STYLE}\n    </style>\n</head>\n<body>")?;
    writeln!(
        html,
        "    <header class=\"header\">\n        <h1>AI 재작성 글 목록</h1>\n        <p>생성 시각 {}</p>\n    </header>",
        escape_html(&manifest.meta.generated_at)
    )?;

    writeln!(html, "    <div class=\"container\">\n        <div class=\"stats\">")?;
    for (number, label) in [
        (manifest.meta.total_articles.to_string(), "총 글 수"),
        (manifest.meta.with_images.to_string(), "이미지 포함"),
        (manifest.meta.ai_rewritten.clone(), "AI 재작성"),
    ] {
        writeln!(
            html,
            "            <div class=\"stat-card\"><div class=\"stat-number\">{}</div><div class=\"stat-label\">{label}</div></div>",
            escape_html(&number)
        )?;
    }
    writeln!(html, "        </div>\n        <div class=\"articles-grid\">")?;

    for article in &manifest.articles {
        let link = escape_html(&format!("{base}/{}", article.filename));
        writeln!(html, "            <div class=\"article-card\">")?;
        writeln!(html, "                <div class=\"article-thumbnail\">")?;
        if !article.thumbnail.is_empty() {
            writeln!(
                html,
                "                    <img src=\"{}\" alt=\"썸네일\">",
                escape_html(&article.thumbnail)
            )?;
        }
        writeln!(html, "                </div>")?;
        writeln!(html, "                <div class=\"article-info\">")?;
        writeln!(
            html,
            "                    <h3><a href=\"{link}\" target=\"_blank\">{}</a></h3>",
            escape_html(&article.title)
        )?;
        let tags = article
            .tags
            .iter()
            .take(3)
            .map(|t| format!("<span class=\"tag\">{}</span>", escape_html(t)))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            html,
            "                    <div class=\"article-tags\"><span class=\"category\">{}</span> {tags}</div>",
            article.category
        )?;
        writeln!(
            html,
            "                    <div class=\"article-actions\"><a href=\"{link}\" class=\"btn-view\" target=\"_blank\">미리보기</a> <button class=\"btn-copy\" onclick=\"copyArticleUrl('{link}')\">링크 복사</button></div>"
        )?;
        writeln!(html, "                </div>\n            </div>")?;
    }

    writeln!(html, "        </div>\n    </div>")?;
    writeln!(html, "    <script>")?;
    writeln!(html, "        function copyArticleUrl(url) {{")?;
    writeln!(
        html,
        "            navigator.clipboard.writeText(url).then(() => {{ alert('링크가 클립보드에 복사되었습니다!\\n' + url); }});"
    )?;
    writeln!(html, "        }}\n    </script>\n</body>\n</html>")?;
    Ok(html)
}

/// Write `index.html` into `output_dir`, replacing any previous one.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_index(
    manifest: &Manifest,
    output_dir: &Path,
    public_base_url: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let html = render_index(manifest, public_base_url)?;
    fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(INDEX_FILE);
    fs::write(&path, html).await?;
    info!(path = %path.display(), cards = manifest.articles.len(), "Wrote index page");
    Ok(path)
}
