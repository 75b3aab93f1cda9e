//! The ingestion pipeline: discover → dedupe → bound → extract → summarize →
//! persist.
//!
//! The orchestrator is generic over the four stage traits so the whole run
//! can be exercised with in-memory fakes. Per-item failure isolation is the
//! load-bearing invariant: each candidate resolves to a
//! `Result<ArticleOutcome, StageFailure>`, failures are logged with the
//! offending URL and counted, and nothing a single candidate does can abort
//! its siblings. Search failures are isolated the same way per query.
//!
//! Candidates are processed through a bounded `buffered` pool; the dedupe
//! seen-set is fully consumed before the per-item stage begins, so no
//! mutable state crosses candidate boundaries.

use crate::error::StageFailure;
use crate::extract::ContentExtractor;
use crate::models::{ArticleRecord, Candidate};
use crate::search::SearchProvider;
use crate::store::ArticleStore;
use crate::summarize::Summarizer;
use crate::utils::clip_chars;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// Run-level cap on candidates entering the extract/summarize/persist stage.
pub const DEFAULT_MAX_ARTICLES: usize = 25;

/// Extracted text shorter than this is "not a real article" and skipped.
pub const MIN_TEXT_CHARS: usize = 400;

/// Persisted titles are clipped to this many characters.
const TITLE_MAX_CHARS: usize = 200;

/// Candidates in flight at once.
const PARALLEL_ITEMS: usize = 4;

/// How one candidate's processing ended, short of a stage failure.
#[derive(Debug, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// The store created a new row.
    Inserted,
    /// A row with this URL already existed; not an error.
    Duplicate,
    /// Extraction found less than [`MIN_TEXT_CHARS`] of text; not an error.
    TooShort,
}

/// Counters for one pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Candidates returned across all queries, before dedupe.
    pub discovered: usize,
    /// Candidates surviving dedupe, before the cap.
    pub unique: usize,
    /// Candidates that entered the per-item stage.
    pub processed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped_short: usize,
    pub failed: usize,
}

/// Drop candidates with empty URLs and within-run URL repeats.
///
/// First-seen order is preserved; one pass, membership set keyed by URL.
/// Cross-run duplicates are the store's concern, handled by the unique
/// constraint at insert time.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !c.url.is_empty())
        .unique_by(|c| c.url.clone())
        .collect()
}

/// The pipeline orchestrator, generic over its four stages.
pub struct Pipeline<S, E, M, P> {
    search: S,
    extractor: E,
    summarizer: M,
    store: P,
    queries: Vec<String>,
    max_articles: usize,
}

impl<S, E, M, P> Pipeline<S, E, M, P>
where
    S: SearchProvider,
    E: ContentExtractor,
    M: Summarizer,
    P: ArticleStore,
{
    pub fn new(
        search: S,
        extractor: E,
        summarizer: M,
        store: P,
        queries: Vec<String>,
        max_articles: usize,
    ) -> Self {
        Self {
            search,
            extractor,
            summarizer,
            store,
            queries,
            max_articles,
        }
    }

    /// Run the full pipeline once and report what happened.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> RunReport {
        let mut candidates = Vec::new();
        for query in &self.queries {
            match self.search.search(query).await {
                Ok(mut found) => candidates.append(&mut found),
                Err(e) => warn!(query = %query, error = %e, "Search query failed; continuing"),
            }
        }
        let discovered = candidates.len();

        let fresh = dedupe(candidates);
        let unique = fresh.len();

        let bounded: Vec<Candidate> = fresh.into_iter().take(self.max_articles).collect();
        info!(
            discovered,
            unique,
            processing = bounded.len(),
            cap = self.max_articles,
            "Candidate set deduplicated and bounded"
        );

        let results: Vec<(Candidate, Result<ArticleOutcome, StageFailure>)> =
            stream::iter(bounded)
                .map(|candidate| async move {
                    let outcome = self.process(&candidate).await;
                    (candidate, outcome)
                })
                .buffered(PARALLEL_ITEMS)
                .collect()
                .await;

        let mut report = RunReport {
            discovered,
            unique,
            ..RunReport::default()
        };
        for (candidate, outcome) in results {
            report.processed += 1;
            match outcome {
                Ok(ArticleOutcome::Inserted) => {
                    info!(url = %candidate.url, "Archived new article");
                    report.inserted += 1;
                }
                Ok(ArticleOutcome::Duplicate) => {
                    info!(url = %candidate.url, "Already archived; skipped");
                    report.duplicates += 1;
                }
                Ok(ArticleOutcome::TooShort) => {
                    info!(url = %candidate.url, "Extracted text too short; skipped");
                    report.skipped_short += 1;
                }
                Err(e) => {
                    warn!(url = %candidate.url, error = %e, "Stage failed; skipping candidate");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            inserted = report.inserted,
            duplicates = report.duplicates,
            skipped_short = report.skipped_short,
            failed = report.failed,
            "Run complete"
        );
        report
    }

    /// Extract → length gate → summarize → persist, for one candidate.
    async fn process(&self, candidate: &Candidate) -> Result<ArticleOutcome, StageFailure> {
        let doc = self.extractor.extract(&candidate.url).await?;
        if doc.text.chars().count() < MIN_TEXT_CHARS {
            return Ok(ArticleOutcome::TooShort);
        }

        let summary = self.summarizer.summarize(&doc.title, &doc.text).await?;

        let title = if doc.title.is_empty() {
            candidate.title.as_str()
        } else {
            doc.title.as_str()
        };
        let record = ArticleRecord {
            url: candidate.url.clone(),
            title: clip_chars(title, TITLE_MAX_CHARS),
            source: candidate.source.clone(),
            summary: summary.summary,
            snippet: summary.snippet,
            tags: summary.tags,
        };

        let created = self.store.insert(&record).await?;
        Ok(if created {
            ArticleOutcome::Inserted
        } else {
            ArticleOutcome::Duplicate
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedDocument, Summary};
    use reqwest::StatusCode;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    fn cand(url: &str) -> Candidate {
        Candidate {
            url: url.to_string(),
            title: format!("Title for {url}"),
            source: "example.com".to_string(),
        }
    }

    struct FakeSearch {
        by_query: HashMap<String, Vec<Candidate>>,
        failing_queries: HashSet<String>,
    }

    impl FakeSearch {
        fn single(query: &str, candidates: Vec<Candidate>) -> Self {
            Self {
                by_query: HashMap::from([(query.to_string(), candidates)]),
                failing_queries: HashSet::new(),
            }
        }
    }

    impl SearchProvider for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<Candidate>, StageFailure> {
            if self.failing_queries.contains(query) {
                return Err(StageFailure::Search(StatusCode::UNPROCESSABLE_ENTITY));
            }
            Ok(self.by_query.get(query).cloned().unwrap_or_default())
        }
    }

    struct FakeExtractor {
        fail_urls: HashSet<String>,
        text_chars_by_url: HashMap<String, usize>,
        default_text_chars: usize,
    }

    impl FakeExtractor {
        fn with_text_chars(chars: usize) -> Self {
            Self {
                fail_urls: HashSet::new(),
                text_chars_by_url: HashMap::new(),
                default_text_chars: chars,
            }
        }
    }

    impl ContentExtractor for FakeExtractor {
        async fn extract(&self, url: &str) -> Result<ExtractedDocument, StageFailure> {
            if self.fail_urls.contains(url) {
                return Err(StageFailure::Fetch(StatusCode::NOT_FOUND));
            }
            let chars = self
                .text_chars_by_url
                .get(url)
                .copied()
                .unwrap_or(self.default_text_chars);
            Ok(ExtractedDocument {
                title: format!("Extracted {url}"),
                text: "a".repeat(chars),
            })
        }
    }

    struct FakeSummarizer;

    impl Summarizer for FakeSummarizer {
        async fn summarize(&self, title: &str, _text: &str) -> Result<Summary, StageFailure> {
            Ok(Summary {
                summary: format!("Summary of {title}"),
                snippet: "A short teaser".to_string(),
                tags: vec!["cards".to_string()],
            })
        }
    }

    /// In-memory store with the real idempotence contract: first insert per
    /// URL returns true, repeats return false.
    struct FakeStore {
        rows: Mutex<HashSet<String>>,
    }

    impl FakeStore {
        fn empty() -> Self {
            Self {
                rows: Mutex::new(HashSet::new()),
            }
        }
    }

    impl ArticleStore for FakeStore {
        async fn insert(&self, record: &ArticleRecord) -> Result<bool, StageFailure> {
            Ok(self.rows.lock().unwrap().insert(record.url.clone()))
        }
    }

    fn pipeline_with(
        search: FakeSearch,
        extractor: FakeExtractor,
        store: FakeStore,
        queries: Vec<String>,
        max_articles: usize,
    ) -> Pipeline<FakeSearch, FakeExtractor, FakeSummarizer, FakeStore> {
        Pipeline::new(search, extractor, FakeSummarizer, store, queries, max_articles)
    }

    #[test]
    fn test_dedupe_drops_repeats_and_keeps_first_seen_order() {
        let input = vec![cand("https://a"), cand("https://b"), cand("https://a"), cand("https://c")];
        let out = dedupe(input);
        let urls: Vec<&str> = out.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
    }

    #[test]
    fn test_dedupe_drops_empty_urls() {
        let input = vec![cand(""), cand("https://a"), cand("")];
        let out = dedupe(input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://a");
    }

    #[test]
    fn test_dedupe_empty_input() {
        assert!(dedupe(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_run_bounds_candidates_at_cap() {
        let candidates: Vec<Candidate> =
            (0..40).map(|i| cand(&format!("https://site/{i}"))).collect();
        let pipeline = pipeline_with(
            FakeSearch::single("q", candidates),
            FakeExtractor::with_text_chars(500),
            FakeStore::empty(),
            vec!["q".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.discovered, 40);
        assert_eq!(report.unique, 40);
        assert_eq!(report.processed, 25);
        assert_eq!(report.inserted, 25);
    }

    #[tokio::test]
    async fn test_per_item_isolation_second_candidate_fails() {
        let candidates = vec![cand("https://a"), cand("https://b"), cand("https://c")];
        let mut extractor = FakeExtractor::with_text_chars(500);
        extractor.fail_urls.insert("https://b".to_string());

        let pipeline = pipeline_with(
            FakeSearch::single("q", candidates),
            extractor,
            FakeStore::empty(),
            vec!["q".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.processed, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_short_content_boundary() {
        let candidates = vec![cand("https://short"), cand("https://long")];
        let mut extractor = FakeExtractor::with_text_chars(0);
        extractor.text_chars_by_url.insert("https://short".to_string(), 399);
        extractor.text_chars_by_url.insert("https://long".to_string(), 400);

        let pipeline = pipeline_with(
            FakeSearch::single("q", candidates),
            extractor,
            FakeStore::empty(),
            vec!["q".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.skipped_short, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_duplicate_insert_counts_as_duplicate_not_error() {
        let store = FakeStore::empty();
        store.rows.lock().unwrap().insert("https://seen".to_string());

        let pipeline = pipeline_with(
            FakeSearch::single("q", vec![cand("https://seen"), cand("https://new")]),
            FakeExtractor::with_text_chars(500),
            store,
            vec!["q".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_store_idempotence_true_then_false() {
        let store = FakeStore::empty();
        let record = ArticleRecord {
            url: "https://a".to_string(),
            title: "T".to_string(),
            source: "example.com".to_string(),
            summary: "S".to_string(),
            snippet: String::new(),
            tags: Vec::new(),
        };
        assert!(store.insert(&record).await.unwrap());
        assert!(!store.insert(&record).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_query_does_not_abort_run() {
        let mut search = FakeSearch::single("good", vec![cand("https://a")]);
        search.failing_queries.insert("bad".to_string());

        let pipeline = pipeline_with(
            search,
            FakeExtractor::with_text_chars(500),
            FakeStore::empty(),
            vec!["bad".to_string(), "good".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn test_cross_query_duplicates_collapse_before_processing() {
        let shared = cand("https://shared");
        let search = FakeSearch {
            by_query: HashMap::from([
                ("one".to_string(), vec![shared.clone(), cand("https://only-one")]),
                ("two".to_string(), vec![shared.clone()]),
            ]),
            failing_queries: HashSet::new(),
        };

        let pipeline = pipeline_with(
            search,
            FakeExtractor::with_text_chars(500),
            FakeStore::empty(),
            vec!["one".to_string(), "two".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.discovered, 3);
        assert_eq!(report.unique, 2);
        assert_eq!(report.inserted, 2);
    }

    #[tokio::test]
    async fn test_persisted_title_falls_back_and_is_clipped() {
        struct TitlelessExtractor;
        impl ContentExtractor for TitlelessExtractor {
            async fn extract(&self, _url: &str) -> Result<ExtractedDocument, StageFailure> {
                Ok(ExtractedDocument {
                    title: String::new(),
                    text: "a".repeat(500),
                })
            }
        }

        struct CapturingStore {
            titles: Mutex<Vec<String>>,
        }
        impl ArticleStore for CapturingStore {
            async fn insert(&self, record: &ArticleRecord) -> Result<bool, StageFailure> {
                self.titles.lock().unwrap().push(record.title.clone());
                Ok(true)
            }
        }

        let mut candidate = cand("https://a");
        candidate.title = "t".repeat(300);

        let pipeline = Pipeline::new(
            FakeSearch::single("q", vec![candidate]),
            TitlelessExtractor,
            FakeSummarizer,
            CapturingStore {
                titles: Mutex::new(Vec::new()),
            },
            vec!["q".to_string()],
            25,
        );

        let report = pipeline.run().await;
        assert_eq!(report.inserted, 1);
        let titles = pipeline.store.titles.lock().unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].chars().count(), 200);
    }
}
