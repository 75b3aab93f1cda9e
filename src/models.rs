//! Data models for discovered, extracted, and persisted articles.
//!
//! The pipeline moves each URL through three transient shapes before it
//! reaches the datastore:
//! - [`Candidate`]: a search hit that has not been fetched yet
//! - [`ExtractedDocument`]: readable title/text recovered from the page
//! - [`Summary`]: the model's structured digest of the document
//!
//! [`ArticleRecord`] is the only persisted shape. It is written once, keyed
//! by URL, and never mutated by this program.

use serde::{Deserialize, Serialize};

/// A discovered link plus metadata, not yet fetched.
///
/// Produced by the search stage, consumed by dedupe and the per-item loop.
/// Lives only for the duration of one run.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The article URL; the eventual unique key in the datastore.
    pub url: String,
    /// The title as reported by the search provider.
    pub title: String,
    /// Hostname of the URL, empty when the URL does not parse.
    pub source: String,
}

/// Readable content recovered from a fetched page.
///
/// Both fields are trimmed. Both may be empty: that is the designed signal
/// for "this page has no main article" (paywalls, landing pages), not an
/// error.
#[derive(Debug, Default)]
pub struct ExtractedDocument {
    pub title: String,
    pub text: String,
}

/// Structured digest of one article.
///
/// Always well-formed: the summarizer caps every field and degrades to a
/// best-effort summary when the model response is not parseable JSON.
#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    /// 1–2 sentence synopsis, at most 600 characters.
    pub summary: String,
    /// Short teaser line, at most 140 characters. Empty on fallback.
    pub snippet: String,
    /// Topical tags, at most 8 entries. Empty on fallback.
    pub tags: Vec<String>,
}

/// The persisted entity, serialized as the datastore's JSON wire shape.
#[derive(Debug, Serialize)]
pub struct ArticleRecord {
    /// Unique key. A second insert with the same URL is rejected as 409.
    pub url: String,
    /// Extracted title, falling back to the search title; at most 200 chars.
    pub title: String,
    /// Hostname the article came from.
    pub source: String,
    pub summary: String,
    pub snippet: String,
    pub tags: Vec<String>,
}
