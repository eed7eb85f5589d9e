//! Title rewriting with structural validation.
//!
//! A rewritten title must keep the shape of the original: the same quotation
//! marks, the same grammatical structure words, and none of the phrasings
//! known to read unnaturally. Each attempt runs through a small state machine
//! and ends either accepted or, after the last attempt, falls back to the
//! original title.

use crate::api::{AskAsync, ChatPrompt, RetryPolicy};
use std::collections::BTreeSet;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Particles and endings whose presence defines the structure of a quoted title.
pub const STRUCTURE_WORDS: &[&str] = &["다더니", "라더니", "에서", "드러난", "의", "로", "으로", "월세로"];

/// Token patterns that mark a generated title as unnatural.
pub const UNNATURAL_PATTERNS: &[&str] = &[" 이 안", " 가 안", " 을 안", " 를 안"];

/// Why a candidate title was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TitleRejection {
    #[error("empty title")]
    Empty,

    #[error("quote count mismatch: original \"{0}/'{1}, rewritten \"{2}/'{3}")]
    QuoteCountMismatch(usize, usize, usize, usize),

    #[error("quotes introduced: \"{0}/'{1}")]
    QuotesIntroduced(usize, usize),

    #[error("structure words changed: original {original:?}, rewritten {rewritten:?}")]
    StructureWordsChanged {
        original: BTreeSet<&'static str>,
        rewritten: BTreeSet<&'static str>,
    },

    #[error("unnatural phrase {0:?}")]
    UnnaturalPhrase(&'static str),
}

fn quote_counts(s: &str) -> (usize, usize) {
    (s.matches('"').count(), s.matches('\'').count())
}

fn has_quotes(s: &str) -> bool {
    s.contains('"') || s.contains('\'')
}

fn structure_words(s: &str) -> BTreeSet<&'static str> {
    STRUCTURE_WORDS
        .iter()
        .copied()
        .filter(|w| s.contains(w))
        .collect()
}

/// Check a candidate against the structural constraints of the original.
pub fn validate_title(original: &str, candidate: &str) -> Result<(), TitleRejection> {
    if candidate.trim().is_empty() {
        return Err(TitleRejection::Empty);
    }

    let (od, os) = quote_counts(original);
    let (cd, cs) = quote_counts(candidate);
    let quoted = has_quotes(original);

    if quoted {
        if od != cd || os != cs {
            return Err(TitleRejection::QuoteCountMismatch(od, os, cd, cs));
        }
        let original_words = structure_words(original);
        let rewritten_words = structure_words(candidate);
        if original_words != rewritten_words {
            return Err(TitleRejection::StructureWordsChanged {
                original: original_words,
                rewritten: rewritten_words,
            });
        }
    } else if cd > 0 || cs > 0 {
        return Err(TitleRejection::QuotesIntroduced(cd, cs));
    }

    if let Some(pattern) = UNNATURAL_PATTERNS.iter().copied().find(|p| candidate.contains(p)) {
        return Err(TitleRejection::UnnaturalPhrase(pattern));
    }
    Ok(())
}

/// Result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TitleAttempt {
    Accepted(String),
    Rejected(TitleRejection),
    CallFailed(String),
}

#[derive(Debug)]
enum TitleState {
    Pending,
    Validating(String),
    Accepted(String),
    ExhaustedFallback,
}

/// How the title step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TitleOutcome {
    Accepted { title: String, attempts: usize },
    Fallback { title: String, attempts: usize },
}

impl TitleOutcome {
    #[cfg(test)]
    pub fn title(&self) -> &str {
        match self {
            TitleOutcome::Accepted { title, .. } | TitleOutcome::Fallback { title, .. } => title,
        }
    }

    pub fn into_title(self) -> String {
        match self {
            TitleOutcome::Accepted { title, .. } | TitleOutcome::Fallback { title, .. } => title,
        }
    }
}

pub(crate) fn title_prompt(original: &str, body: &str) -> ChatPrompt {
    let excerpt: String = body.chars().take(1000).collect();
    let rules = if has_quotes(original) {
        "Keep the exact grammar and structure of the original title. Keep every double and single \
         quotation mark, with the same count and position, and every particle and ending. Only \
         the words inside the quotation marks may change."
    } else {
        "Keep the sentence structure of the original title and change only the key words so they \
         match the article. Do not add any quotation marks. Write natural, grammatical Korean."
    };
    ChatPrompt {
        system: "You rewrite Korean headlines. You preserve the grammar and structure of the \
                 original title exactly and never drop quotation marks."
            .to_string(),
        user: format!(
            "Original title: {original}\n\nArticle excerpt:\n{excerpt}...\n\n{rules}\n\n\
             Reply with the new title only."
        ),
        max_tokens: 200,
        temperature: 0.2,
    }
}

/// Ask for a rewritten title until one passes validation or attempts run out.
pub async fn rewrite_title<A>(
    client: &A,
    policy: &RetryPolicy,
    original: &str,
    body: &str,
) -> TitleOutcome
where
    A: AskAsync<Response = String>,
{
    let prompt = title_prompt(original, body);
    let mut attempts = 0usize;
    let mut state = TitleState::Pending;

    loop {
        state = match state {
            TitleState::Pending if attempts >= policy.max_attempts => TitleState::ExhaustedFallback,
            TitleState::Pending => {
                attempts += 1;
                match client.ask(&prompt).await {
                    Ok(reply) => TitleState::Validating(reply.trim().to_string()),
                    Err(e) => {
                        let attempt = TitleAttempt::CallFailed(e.to_string());
                        warn!(attempt = attempts, result = ?attempt, "Title rewrite call failed");
                        sleep(policy.delay_after(attempts)).await;
                        TitleState::Pending
                    }
                }
            }
            TitleState::Validating(candidate) => {
                let attempt = match validate_title(original, &candidate) {
                    Ok(()) => TitleAttempt::Accepted(candidate),
                    Err(rejection) => TitleAttempt::Rejected(rejection),
                };
                match attempt {
                    TitleAttempt::Accepted(title) => TitleState::Accepted(title),
                    other => {
                        warn!(attempt = attempts, result = ?other, "Rewritten title rejected");
                        TitleState::Pending
                    }
                }
            }
            TitleState::Accepted(title) => {
                info!(%title, attempts, "Title rewritten");
                return TitleOutcome::Accepted { title, attempts };
            }
            TitleState::ExhaustedFallback => {
                warn!(attempts, "Title rewrite exhausted; keeping original");
                return TitleOutcome::Fallback {
                    title: original.to_string(),
                    attempts,
                };
            }
        };
    }
}
