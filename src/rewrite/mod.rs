//! Rewriting a scraped draft through the generation API.
//!
//! [`Rewriter`] owns the optional API client and the retry policy of each
//! call. The title and tag steps always produce something usable; the body
//! step is the only one whose failure fails the entry. With manual rewriting
//! enabled the API is never called and the body goes through
//! [`manual::manual_rewrite`].

pub mod manual;
pub mod title;

use crate::api::{AskAsync, ChatPrompt, RetryAsk, RetryPolicy};
use crate::config::Config;
use crate::error::ItemError;
use crate::scrapers::entry::DEFAULT_TAGS;
use crate::utils::truncate_for_log;
use itertools::Itertools;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

pub use title::TitleOutcome;

/// Alt text used when none can be generated.
pub const DEFAULT_ALT_TEXT: &str = "기사 관련 이미지";

pub struct Rewriter<A> {
    client: Option<A>,
    manual: bool,
    title_retry: RetryPolicy,
    body_retry: RetryPolicy,
    tag_retry: RetryPolicy,
}

impl<A> Rewriter<A>
where
    A: AskAsync<Response = String>,
{
    /// A rewriter with the default call policies.
    pub fn new(client: Option<A>, manual: bool) -> Self {
        Self {
            client,
            manual,
            title_retry: RetryPolicy::new(3, Duration::ZERO),
            body_retry: RetryPolicy::fixed(3, Duration::from_secs(2)),
            tag_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
        }
    }

    pub fn from_config(client: Option<A>, config: &Config) -> Self {
        Self::new(client, config.manual_rewrite).with_policies(
            config.title_retry,
            config.body_retry,
            config.tag_retry,
        )
    }

    pub fn with_policies(mut self, title: RetryPolicy, body: RetryPolicy, tags: RetryPolicy) -> Self {
        self.title_retry = title;
        self.body_retry = body;
        self.tag_retry = tags;
        self
    }

    /// True when bodies come from the manual transform instead of the API.
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    fn api(&self) -> Option<&A> {
        if self.manual { None } else { self.client.as_ref() }
    }

    /// Rewrite the title, keeping the original when no client is available.
    pub async fn rewrite_title(&self, original: &str, body: &str) -> TitleOutcome {
        match self.api() {
            Some(client) => title::rewrite_title(client, &self.title_retry, original, body).await,
            None => TitleOutcome::Fallback {
                title: original.to_string(),
                attempts: 0,
            },
        }
    }

    /// Rewrite the body.
    ///
    /// A reply is accepted when it is non-empty and differs from the input.
    /// Code fences are removed and `---` becomes `—`. Running out of attempts
    /// is an error.
    #[instrument(level = "info", skip_all, fields(title = %title))]
    pub async fn rewrite_body(&self, title: &str, body: &str) -> Result<String, ItemError> {
        if self.manual {
            info!("Using manual rewrite");
            return Ok(manual::manual_rewrite(body, title));
        }
        let client = self.client.as_ref().ok_or(ItemError::MissingApiKey)?;

        let prompt = body_prompt(title, body);
        let max = self.body_retry.max_attempts;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max {
            match client.ask(&prompt).await {
                Ok(reply) => {
                    let cleaned = clean_body(&reply);
                    if cleaned.is_empty() {
                        last_error = "empty reply".to_string();
                    } else if cleaned == body.trim() {
                        last_error = "reply identical to input".to_string();
                    } else {
                        info!(attempt, chars = cleaned.chars().count(), "Body rewritten");
                        return Ok(cleaned);
                    }
                    warn!(attempt, max, reason = %last_error, "Body rewrite rejected");
                }
                Err(e) => {
                    warn!(attempt, max, error = %e, "Body rewrite call failed");
                    last_error = e.to_string();
                }
            }
            if attempt < max {
                sleep(self.body_retry.delay_after(attempt)).await;
            }
        }
        Err(ItemError::Rewrite(format!(
            "body rewrite failed after {max} attempts: {last_error}"
        )))
    }

    /// Append two generated tags to `existing`, or the defaults when
    /// generation is unavailable or keeps failing.
    #[instrument(level = "info", skip_all)]
    pub async fn generate_tags(&self, title: &str, body: &str, existing: &[String]) -> Vec<String> {
        let generated = match self.api() {
            Some(client) => self.ask_for_tags(client, title, body, existing).await,
            None => None,
        };
        let extra: Vec<String> = match generated {
            Some(tags) => tags,
            None => DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        };
        existing.iter().cloned().chain(extra).unique().collect()
    }

    async fn ask_for_tags(
        &self,
        client: &A,
        title: &str,
        body: &str,
        existing: &[String],
    ) -> Option<Vec<String>> {
        let prompt = tag_prompt(title, body, existing);
        let max = self.tag_retry.max_attempts;
        for attempt in 1..=max {
            match client.ask(&prompt).await {
                Ok(reply) => match parse_tag_array(&reply) {
                    Some(tags) if tags.len() >= 2 => {
                        info!(attempt, ?tags, "Tags generated");
                        return Some(tags.into_iter().take(2).collect());
                    }
                    _ => warn!(attempt, reply = %truncate_for_log(&reply, 120), "Unusable tag reply"),
                },
                Err(e) => warn!(attempt, error = %e, "Tag generation call failed"),
            }
            if attempt < max {
                sleep(self.tag_retry.delay_after(attempt)).await;
            }
        }
        warn!("Tag generation exhausted; using defaults");
        None
    }

    /// Short alt text for an image placed after `paragraph`.
    pub async fn generate_alt_text(&self, paragraph: &str, title: &str) -> String {
        let Some(client) = self.api() else {
            return DEFAULT_ALT_TEXT.to_string();
        };
        let api = RetryAsk::new(client, self.tag_retry);
        match api.ask(&alt_text_prompt(paragraph, title)).await {
            Ok(reply) => {
                let alt = reply.trim().trim_matches('"').trim_matches('\'').trim();
                if alt.is_empty() {
                    DEFAULT_ALT_TEXT.to_string()
                } else {
                    alt.to_string()
                }
            }
            Err(e) => {
                warn!(error = %e, "Alt text generation failed; using default");
                DEFAULT_ALT_TEXT.to_string()
            }
        }
    }
}

fn clean_body(reply: &str) -> String {
    reply.replace("```", "").replace("---", "—").trim().to_string()
}

/// The JSON string array inside a reply, tolerating surrounding prose or fences.
fn parse_tag_array(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    let tags: Vec<String> = serde_json::from_str(&reply[start..=end]).ok()?;
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Some(tags)
}

fn body_prompt(title: &str, body: &str) -> ChatPrompt {
    ChatPrompt {
        system: "You are a Korean news writer. You rewrite articles in a completely new voice \
                 and structure while keeping every fact, date, figure and proper noun. Use bold \
                 text sparingly."
            .to_string(),
        user: format!(
            "Title: {title}\n\nOriginal article:\n{body}\n\n\
             Rewrite this article in Korean with a different angle, tone and order of \
             information. Express percentages in other ways (for example \"30%\" as \"10명 중 3명\").\n\
             Structure:\n\
             1. Start with one H5 summary line holding two bold lines joined by <br>: \
             ##### **first line**<br>**second line**\n\
             2. Two or three intro paragraphs without headings.\n\
             3. Then sections with H2 (##) headings only. No H1, H3, H4 or H6. No colons, \
             exclamation marks or question marks in headings.\n\
             Bold at most one or two key phrases per paragraph."
        ),
        max_tokens: 2000,
        temperature: 0.8,
    }
}

fn tag_prompt(title: &str, body: &str, existing: &[String]) -> ChatPrompt {
    let excerpt: String = body.chars().take(500).collect();
    ChatPrompt {
        system: "You create distinctive Korean search tags for news articles.".to_string(),
        user: format!(
            "Title: {title}\nContent: {excerpt}...\nExisting tags: {}\n\n\
             Create two new Korean tags from a different angle than the existing ones, useful \
             as search keywords for readers aged 35 to 60 (e.g. \"미래전망\", \"업계동향\").\n\
             Reply with a JSON array only: [\"tag1\", \"tag2\"]",
            existing.join(", ")
        ),
        max_tokens: 100,
        temperature: 0.7,
    }
}

fn alt_text_prompt(paragraph: &str, title: &str) -> ChatPrompt {
    let excerpt: String = paragraph.chars().take(200).collect();
    ChatPrompt {
        system: "You are an SEO specialist writing image alt text that fits the article."
            .to_string(),
        user: format!(
            "Article title: {title}\nParagraph: {excerpt}...\n\n\
             Write a natural Korean alt text of about 10 to 15 characters for an image placed \
             here, related to the paragraph. Reply with the alt text only."
        ),
        max_tokens: 50,
        temperature: 0.7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAsk;

    fn no_wait() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    fn rewriter(fake: &ScriptedAsk) -> Rewriter<&ScriptedAsk> {
        Rewriter::new(Some(fake), false).with_policies(no_wait(), no_wait(), no_wait())
    }

    fn offline(manual: bool) -> Rewriter<ScriptedAsk> {
        Rewriter::new(None, manual).with_policies(no_wait(), no_wait(), no_wait())
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_body_is_cleaned() {
        let fake = ScriptedAsk::new(vec![Ok("```\n##### **요약**\n\n본문 --- 끝\n```")]);
        let body = rewriter(&fake).rewrite_body("제목", "원문").await.unwrap();
        assert_eq!(body, "##### **요약**\n\n본문 — 끝");
    }

    #[tokio::test]
    async fn test_body_rejects_empty_and_identical_replies() {
        let fake = ScriptedAsk::new(vec![Ok("   "), Ok("원문"), Ok("새 본문")]);
        let body = rewriter(&fake).rewrite_body("제목", "원문").await.unwrap();
        assert_eq!(body, "새 본문");
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_body_exhaustion_is_an_error() {
        let fake = ScriptedAsk::new(vec![Err("a"), Err("b"), Err("c"), Ok("late")]);
        let err = rewriter(&fake).rewrite_body("제목", "원문").await.unwrap_err();
        assert!(matches!(err, ItemError::Rewrite(_)));
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_body_without_client_needs_api_key() {
        let err = offline(false).rewrite_body("제목", "원문").await.unwrap_err();
        assert!(matches!(err, ItemError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_manual_mode_never_calls_api() {
        let fake = ScriptedAsk::new(vec![Ok("unused")]);
        let rewriter = Rewriter::new(Some(&fake), true);
        assert!(rewriter.is_manual());

        let body = rewriter.rewrite_body("제목", "첫 문장. 둘째 문장.").await.unwrap();
        assert!(body.starts_with("##### **제목의 핵심 내용 요약**"));
        let title = rewriter.rewrite_title("제목", "본문").await;
        assert_eq!(title.title(), "제목");
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_title_without_client_keeps_original() {
        let outcome = offline(false).rewrite_title("원래 제목", "본문").await;
        assert_eq!(
            outcome,
            TitleOutcome::Fallback {
                title: "원래 제목".to_string(),
                attempts: 0
            }
        );
    }

    #[tokio::test]
    async fn test_tags_append_first_two_generated() {
        let fake = ScriptedAsk::new(vec![Ok(
            "```json\n[\"미래전망\", \"업계동향\", \"extra\"]\n```",
        )]);
        let result = rewriter(&fake)
            .generate_tags("제목", "본문", &tags(&["뉴스", "이슈"]))
            .await;
        assert_eq!(result, tags(&["뉴스", "이슈", "미래전망", "업계동향"]));
    }

    #[tokio::test]
    async fn test_tags_retry_on_unparseable_reply() {
        let fake = ScriptedAsk::new(vec![Ok("태그는 미래전망"), Ok("[\"하나\"]"), Ok("[\"a\", \"b\"]")]);
        let result = rewriter(&fake).generate_tags("제목", "본문", &tags(&["x"])).await;
        assert_eq!(result, tags(&["x", "a", "b"]));
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_tags_fall_back_to_defaults() {
        let fake = ScriptedAsk::new(vec![Err("a"), Err("b"), Err("c")]);
        let result = rewriter(&fake).generate_tags("제목", "본문", &tags(&["자동차"])).await;
        assert_eq!(result, tags(&["자동차", "뉴스", "이슈"]));

        let result = offline(false).generate_tags("제목", "본문", &tags(&["뉴스", "이슈"])).await;
        assert_eq!(result, tags(&["뉴스", "이슈"]));
    }

    #[tokio::test]
    async fn test_alt_text_trims_quotes_and_falls_back() {
        let fake = ScriptedAsk::new(vec![Err("timeout"), Ok("\"전기차 충전소 모습\"")]);
        assert_eq!(
            rewriter(&fake).generate_alt_text("문단", "제목").await,
            "전기차 충전소 모습"
        );

        let fake = ScriptedAsk::new(vec![Ok("''")]);
        assert_eq!(rewriter(&fake).generate_alt_text("문단", "제목").await, DEFAULT_ALT_TEXT);

        assert_eq!(offline(false).generate_alt_text("문단", "제목").await, DEFAULT_ALT_TEXT);
    }

    #[test]
    fn test_parse_tag_array() {
        assert_eq!(parse_tag_array("[\"a\", \" b \"]"), Some(tags(&["a", "b"])));
        assert_eq!(parse_tag_array("no json"), None);
        assert_eq!(parse_tag_array("] backwards ["), None);
        assert_eq!(parse_tag_array("[1, 2]"), None);
    }
}
