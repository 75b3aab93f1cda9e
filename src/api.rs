//! LLM API interaction with exponential backoff retry logic.
//!
//! This module talks to an OpenAI-compatible chat-completions endpoint and
//! adds bounded retry with exponential backoff and jitter around it.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`ChatCompletions`]: reqwest-backed client for `/chat/completions`
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync`
//!
//! # Retry Strategy
//!
//! - Bounded retry attempts (3 for summarization)
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Only the model call retries; search, fetch, and store stay single-shot.

use crate::error::StageFailure;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a model and return its raw text response.
/// The abstraction exists so decorators (like retry) and test fakes can
/// stand in for the real client.
pub trait AskAsync {
    /// Send a prompt to the model and receive its raw text response.
    async fn ask(&self, prompt: &str) -> Result<String, StageFailure>;
}

impl<T: AskAsync> AskAsync for &T {
    async fn ask(&self, prompt: &str) -> Result<String, StageFailure> {
        (**self).ask(prompt).await
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`].
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, StageFailure> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
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

/// Reqwest-backed client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Sends a single-turn conversation (one user message) and returns the text
/// of the first choice. Non-success statuses and empty choice lists map to
/// [`StageFailure::Summarize`].
pub struct ChatCompletions {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl ChatCompletions {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
            temperature,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl AskAsync for ChatCompletions {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, StageFailure> {
        let t0 = Instant::now();
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });

        let endpoint = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let res = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_for_log(&body, 300), "chat completion rejected");
            return Err(StageFailure::Summarize(format!(
                "status {status}: {}",
                truncate_for_log(&body, 300)
            )));
        }

        let parsed: ChatResponse = res.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                StageFailure::Summarize("response contained no choices".to_string())
            })?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u128,
            "chat completion succeeded"
        );
        Ok(content)
    }
}

/// Call the model with exponential backoff retry logic.
///
/// This is the summarizer's entry point into the API: up to 3 retries with
/// backoff 1s, 2s, 4s (capped at 30s) plus jitter. Exhausted retries return
/// the last failure, which the orchestrator turns into a per-item skip.
#[instrument(level = "info", skip_all)]
pub async fn ask_with_backoff(
    chat: &ChatCompletions,
    prompt: &str,
) -> Result<String, StageFailure> {
    let t0 = Instant::now();
    let api = RetryAsk::new(chat, 3, StdDuration::from_secs(1));
    let res = api.ask(prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(
            elapsed_ms_total = dt.as_millis() as u128,
            "ask_with_backoff succeeded"
        ),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u128, error = %e, "ask_with_backoff failed")
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FlakyAsk {
        calls: Mutex<usize>,
        succeed_on: usize,
    }

    impl AskAsync for FlakyAsk {
        async fn ask(&self, _prompt: &str) -> Result<String, StageFailure> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls >= self.succeed_on {
                Ok("ok".to_string())
            } else {
                Err(StageFailure::Summarize("transient".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let flaky = FlakyAsk {
            calls: Mutex::new(0),
            succeed_on: 3,
        };
        let api = RetryAsk::new(&flaky, 5, StdDuration::from_millis(1));
        let res = api.ask("prompt").await;
        assert_eq!(res.unwrap(), "ok");
        assert_eq!(*flaky.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let broken = FlakyAsk {
            calls: Mutex::new(0),
            succeed_on: usize::MAX,
        };
        let api = RetryAsk::new(&broken, 2, StdDuration::from_millis(1));
        let res = api.ask("prompt").await;
        assert!(res.is_err());
        // initial attempt plus two retries
        assert_eq!(*broken.calls.lock().unwrap(), 3);
    }
}
