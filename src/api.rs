//! Generation API interaction with bounded retries.
//!
//! This module talks to an OpenAI-compatible chat completion endpoint.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining one async generation call
//! - [`OpenAiChat`]: `reqwest` client for `POST {base}/chat/completions`
//! - [`RetryAsk`]: Decorator that retries any `AskAsync` implementation
//!
//! Calls that need to validate the response between attempts (title, body,
//! tags) run their own loops in [`crate::rewrite`] with the same
//! [`RetryPolicy`]; plain calls go through [`RetryAsk`].

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// One chat completion request: a system role, a user prompt and sampling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for async generation calls.
///
/// Implementors send a prompt to a language model and return its reply.
/// The abstraction lets the pipeline swap in decorators (retry) or fakes.
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Send a prompt and receive the model's reply.
    async fn ask(&self, prompt: &ChatPrompt) -> Result<Self::Response, Box<dyn Error>>;
}

impl<T: AskAsync> AskAsync for &T {
    type Response = T::Response;

    async fn ask(&self, prompt: &ChatPrompt) -> Result<Self::Response, Box<dyn Error>> {
        (**self).ask(prompt).await
    }
}

/// How many times a call is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Wait before the second attempt; doubles for each further attempt.
    pub base_delay: StdDuration,
    /// Cap on a single wait.
    pub max_delay: StdDuration,
    /// Upper bound of the random time added to each wait.
    pub jitter: StdDuration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: StdDuration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            jitter: StdDuration::from_millis(250),
        }
    }

    /// The same wait after every failed attempt, without backoff or jitter.
    pub fn fixed(max_attempts: usize, delay: StdDuration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            jitter: StdDuration::ZERO,
        }
    }

    /// Delay to sleep after the given failed attempt (1-based).
    ///
    /// ```text
    /// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=jitter)
    /// ```
    ///
    /// A zero base delay yields no wait at all.
    pub fn delay_after(&self, attempt: usize) -> StdDuration {
        if self.base_delay.is_zero() {
            return StdDuration::ZERO;
        }
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        if self.jitter.is_zero() {
            return delay;
        }
        delay + rng().random_range(StdDuration::ZERO..=self.jitter)
    }
}

/// Wrapper that retries any [`AskAsync`] implementation according to a [`RetryPolicy`].
pub struct RetryAsk<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_attempts", &self.policy.max_attempts)
            .field("base_delay", &self.policy.base_delay)
            .field("max_delay", &self.policy.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &ChatPrompt) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt >= self.policy.max_attempts {
                        error!(
                            attempt,
                            max = self.policy.max_attempts,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max = self.policy.max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completion endpoint.
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

impl AskAsync for OpenAiChat {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &ChatPrompt) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let res = async {
            let response: ChatResponse = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let content = response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or("completion contained no message content")?;
            Ok::<String, Box<dyn Error>>(content.trim().to_string())
        }
        .await;

        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "API call failed");
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAsk;

    fn prompt() -> ChatPrompt {
        ChatPrompt {
            system: "system".to_string(),
            user: "user".to_string(),
            max_tokens: 10,
            temperature: 0.5,
        }
    }

    #[test]
    fn test_zero_base_delay_never_sleeps() {
        let policy = RetryPolicy::new(3, StdDuration::ZERO);
        assert_eq!(policy.delay_after(1), StdDuration::ZERO);
        assert_eq!(policy.delay_after(2), StdDuration::ZERO);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new(10, StdDuration::from_secs(20));
        let delay = policy.delay_after(5);
        assert!(delay <= StdDuration::from_secs(30) + StdDuration::from_millis(250));
        assert!(delay >= StdDuration::from_secs(30));
    }

    #[test]
    fn test_fixed_policy_waits_the_same_every_time() {
        let policy = RetryPolicy::fixed(3, StdDuration::from_secs(2));
        assert_eq!(policy.delay_after(1), StdDuration::from_secs(2));
        assert_eq!(policy.delay_after(2), StdDuration::from_secs(2));
        assert_eq!(policy.delay_after(5), StdDuration::from_secs(2));
    }

    #[test]
    fn test_backoff_doubles_before_cap() {
        let policy = RetryPolicy::new(5, StdDuration::from_secs(1));
        let second = policy.delay_after(2);
        assert!(second >= StdDuration::from_secs(2));
        assert!(second <= StdDuration::from_millis(2250));
    }

    #[tokio::test]
    async fn test_retry_ask_recovers_after_failure() {
        let fake = ScriptedAsk::new(vec![Err("boom"), Ok("hello")]);
        let api = RetryAsk::new(&fake, RetryPolicy::new(3, StdDuration::ZERO));
        let reply = api.ask(&prompt()).await.unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_ask_gives_up_after_max_attempts() {
        let fake = ScriptedAsk::new(vec![Err("a"), Err("b"), Err("c"), Ok("late")]);
        let api = RetryAsk::new(&fake, RetryPolicy::new(3, StdDuration::ZERO));
        assert!(api.ask(&prompt()).await.is_err());
        assert_eq!(fake.calls(), 3);
    }
}
