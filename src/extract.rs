//! Readable-content extraction from arbitrary article pages.
//!
//! Fetches a page with redirects followed and a descriptive user-agent
//! (several news sites block empty or default agents), then runs the
//! `readability` main-content heuristic over the HTML to strip navigation,
//! ads, and boilerplate.
//!
//! A page where the heuristic finds no article (paywalls, index pages,
//! script-only shells) yields an [`ExtractedDocument`] with empty fields.
//! Emptiness is the designed "skip this item" signal, not an error. Only the
//! fetch itself can fail.

use crate::error::StageFailure;
use crate::models::ExtractedDocument;
use reqwest::redirect;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; HobbyHeadlinesBot/1.0)";
const REDIRECT_LIMIT: usize = 10;
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches a URL and recovers its main readable content.
pub trait ContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedDocument, StageFailure>;
}

/// HTTP-backed extractor using the readability heuristic.
pub struct PageExtractor {
    client: reqwest::Client,
}

impl PageExtractor {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl ContentExtractor for PageExtractor {
    #[instrument(level = "info", skip(self), fields(%url))]
    async fn extract(&self, url: &str) -> Result<ExtractedDocument, StageFailure> {
        let target = Url::parse(url)?;

        let res = self.client.get(target.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(StageFailure::Fetch(status));
        }

        let html = res.text().await?;
        let doc = readable(&html, &target);
        debug!(
            title_chars = doc.title.chars().count(),
            text_chars = doc.text.chars().count(),
            "Extracted readable content"
        );
        Ok(doc)
    }
}

/// Run the readability heuristic over raw HTML.
///
/// Failure to find a main-content region maps to empty fields. Both fields
/// are trimmed.
fn readable(html: &str, url: &Url) -> ExtractedDocument {
    match readability::extractor::extract(&mut html.as_bytes(), url) {
        Ok(product) => ExtractedDocument {
            title: product.title.trim().to_string(),
            text: product.text.trim().to_string(),
        },
        Err(e) => {
            warn!(%url, error = %e, "Readability found no article content");
            ExtractedDocument::default()
        }
    }
}
