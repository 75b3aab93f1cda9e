//! Failure taxonomy for the ingestion pipeline.
//!
//! Every stage reports its failures as a [`StageFailure`]. The orchestrator
//! catches these per candidate (or per query, for search) and skips the item;
//! nothing in this enum is allowed to abort a run. A duplicate row is not a
//! failure at all; [`crate::store`] reports it as a plain `false`.

use reqwest::StatusCode;
use thiserror::Error;

/// A per-stage, per-item failure.
///
/// Carried inside `Result<ArticleOutcome, StageFailure>` for each candidate
/// the pipeline processes.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// The search API answered with a non-success status.
    #[error("search request failed with status {0}")]
    Search(StatusCode),

    /// An article fetch answered with a non-success status.
    #[error("article fetch failed with status {0}")]
    Fetch(StatusCode),

    /// The language-model call failed after exhausting retries.
    #[error("summarize call failed: {0}")]
    Summarize(String),

    /// The datastore rejected a write with something other than a 409.
    #[error("store write failed with status {status}: {body}")]
    Store { status: StatusCode, body: String },

    /// A candidate URL could not be parsed at all.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure (DNS, timeout, connection refused, bad body).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_status() {
        let e = StageFailure::Search(StatusCode::TOO_MANY_REQUESTS);
        assert!(e.to_string().contains("429"));

        let e = StageFailure::Fetch(StatusCode::FORBIDDEN);
        assert!(e.to_string().contains("403"));
    }

    #[test]
    fn test_store_failure_carries_body() {
        let e = StageFailure::Store {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "relation \"articles\" does not exist".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("does not exist"));
    }
}
