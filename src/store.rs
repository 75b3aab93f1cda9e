//! Idempotent article persistence against a Supabase REST endpoint.
//!
//! One `POST /rest/v1/articles` per record, `Prefer: return=minimal` so the
//! datastore answers without echoing the row. URL uniqueness is enforced by
//! the table's unique constraint: a 409 conflict means "already archived"
//! and maps to `Ok(false)` rather than an error. Records are never updated
//! or deleted here; first write wins.

use crate::error::StageFailure;
use crate::models::ArticleRecord;
use reqwest::StatusCode;
use tracing::{debug, instrument};

/// First-write-wins persistence keyed by article URL.
pub trait ArticleStore {
    /// Insert a record. `Ok(true)` means newly created, `Ok(false)` means a
    /// row with this URL already existed.
    async fn insert(&self, record: &ArticleRecord) -> Result<bool, StageFailure>;
}

/// Supabase (PostgREST) backed store.
pub struct SupabaseStore {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(client: reqwest::Client, base_url: &str, service_key: String) -> Self {
        let endpoint = format!("{}/rest/v1/articles", base_url.trim_end_matches('/'));
        Self {
            client,
            endpoint,
            service_key,
        }
    }
}

impl ArticleStore for SupabaseStore {
    #[instrument(level = "info", skip_all, fields(url = %record.url))]
    async fn insert(&self, record: &ArticleRecord) -> Result<bool, StageFailure> {
        let res = self
            .client
            .post(self.endpoint.as_str())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::CONFLICT {
            debug!("Record already exists; duplicate skip");
            return Ok(false);
        }
        if status.is_success() {
            debug!("Record inserted");
            return Ok(true);
        }

        let body = res.text().await.unwrap_or_default();
        Err(StageFailure::Store { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_strips_trailing_slash() {
        let client = reqwest::Client::new();
        let store = SupabaseStore::new(client, "https://example.supabase.co/", "key".into());
        assert_eq!(store.endpoint, "https://example.supabase.co/rest/v1/articles");
    }

    #[test]
    fn test_endpoint_join_without_trailing_slash() {
        let client = reqwest::Client::new();
        let store = SupabaseStore::new(client, "https://example.supabase.co", "key".into());
        assert_eq!(store.endpoint, "https://example.supabase.co/rest/v1/articles");
    }
}
