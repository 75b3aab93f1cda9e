//! Structured article summarization through a chat-completion call.
//!
//! The prompt asks for strict JSON with exactly three keys (`summary`,
//! `snippet`, `tags`) and the model is called at low temperature to favor
//! determinism. "Strict JSON" is a request, not a guarantee: when the
//! response does not parse, the raw text itself becomes the summary (capped)
//! with an empty snippet and no tags. That fallback never errors, so a
//! well-formed [`Summary`] always comes back once the API call itself has
//! succeeded.
//!
//! Input text is clipped to a bounded prefix before it is sent. This is a
//! deliberate lossy truncation to bound cost and latency: summaries are
//! produced from the lead portion of an article only.

use crate::api::{ChatCompletions, ask_with_backoff};
use crate::error::StageFailure;
use crate::models::Summary;
use crate::utils::{clip_chars, truncate_for_log};
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Characters of article text sent to the model.
const MAX_INPUT_CHARS: usize = 9000;

/// Field caps, applied whether or not the model honored them.
const SUMMARY_MAX_CHARS: usize = 600;
const SNIPPET_MAX_CHARS: usize = 140;
const TAGS_MAX: usize = 8;

/// Sampling temperature for summarization calls.
pub const TEMPERATURE: f32 = 0.3;

/// Produces a structured summary from an extracted document.
pub trait Summarizer {
    async fn summarize(&self, title: &str, text: &str) -> Result<Summary, StageFailure>;
}

/// Summarizer backed by an OpenAI-compatible chat model.
pub struct OpenAiSummarizer {
    chat: ChatCompletions,
}

impl OpenAiSummarizer {
    pub fn new(chat: ChatCompletions) -> Self {
        Self { chat }
    }
}

impl Summarizer for OpenAiSummarizer {
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(title, 80)))]
    async fn summarize(&self, title: &str, text: &str) -> Result<Summary, StageFailure> {
        let prompt = build_prompt(title, &clip_chars(text, MAX_INPUT_CHARS));
        let raw = ask_with_backoff(&self.chat, &prompt).await?;
        Ok(parse_summary(&raw))
    }
}

fn build_prompt(title: &str, clipped_text: &str) -> String {
    format!(
        "You summarize trading-card hobby news for a link archive.\n\
         Return ONLY a strict JSON object with exactly these three keys and nothing else:\n\
         - \"summary\": 1-2 neutral sentences describing what the article reports\n\
         - \"snippet\": a teaser of 8-15 words, not a verbatim quote from the article\n\
         - \"tags\": an array of 3-6 short topical tags, lowercase\n\n\
         Title: {title}\n\n\
         Article:\n{clipped_text}"
    )
}

/// Turn a raw model response into a well-formed [`Summary`].
///
/// Valid JSON objects are coerced field by field with the caps applied;
/// anything else degrades to the raw text as summary. This function cannot
/// fail.
fn parse_summary(raw: &str) -> Summary {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => Summary {
            summary: clip_chars(&coerce_string(value.get("summary")), SUMMARY_MAX_CHARS),
            snippet: clip_chars(&coerce_string(value.get("snippet")), SNIPPET_MAX_CHARS),
            tags: coerce_tags(value.get("tags")),
        },
        Ok(other) => {
            debug!(kind = %json_kind(&other), "Model returned non-object JSON; using raw fallback");
            fallback(raw)
        }
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(raw, 300),
                "Model returned non-JSON; using raw fallback"
            );
            fallback(raw)
        }
    }
}

fn fallback(raw: &str) -> Summary {
    Summary {
        summary: clip_chars(raw, SUMMARY_MAX_CHARS),
        snippet: String::new(),
        tags: Vec::new(),
    }
}

/// String coercion matching the "best effort" contract: missing and null
/// become empty, strings pass through, everything else renders as JSON.
fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn coerce_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .take(TAGS_MAX)
            .map(|v| coerce_string(Some(v)))
            .collect(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
