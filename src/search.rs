//! Candidate discovery through the Brave web-search API.
//!
//! One GET per query against `res/v1/web/search`, authenticated with the
//! `X-Subscription-Token` header. The response nests hits under
//! `web.results`; a missing nest is treated as zero hits, not an error.
//!
//! Hits with an empty or malformed URL are still returned; filtering them
//! is the deduplication stage's job, which keeps this client a faithful view
//! of what the provider said. No retries happen here.

use crate::error::StageFailure;
use crate::models::Candidate;
use crate::utils::host_of;
use serde::Deserialize;
use tracing::{debug, info, instrument};

const SEARCH_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Results requested per query. Fixed: the run-level cap lives in the
/// pipeline, not here.
const RESULT_COUNT: u32 = 10;

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: WebResults,
}

#[derive(Debug, Default, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
}

impl WebResult {
    fn into_candidate(self) -> Candidate {
        let source = host_of(&self.url);
        Candidate {
            url: self.url,
            title: self.title,
            source,
        }
    }
}

/// A search provider that turns a query string into candidate links.
pub trait SearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, StageFailure>;
}

/// Brave web-search client.
pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
}

impl BraveSearch {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

impl SearchProvider for BraveSearch {
    #[instrument(level = "info", skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, StageFailure> {
        let count = RESULT_COUNT.to_string();
        let res = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query), ("count", count.as_str())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(StageFailure::Search(status));
        }

        let parsed: SearchResponse = res.json().await?;
        let candidates: Vec<Candidate> = parsed
            .web
            .results
            .into_iter()
            .map(WebResult::into_candidate)
            .collect();

        info!(count = candidates.len(), query, "Search query returned candidates");
        debug!(urls = ?candidates.iter().map(|c| &c.url).collect::<Vec<_>>(), "Candidate URLs");

        Ok(candidates)
    }
}
