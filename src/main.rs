//! # Hobby Headlines
//!
//! A content-ingestion pipeline for trading-card hobby news. Each run
//! discovers candidate articles through the Brave search API, extracts their
//! readable text, summarizes them through an OpenAI-compatible model, and
//! archives novel items into a Supabase table keyed by URL.
//!
//! ## Usage
//!
//! ```sh
//! BRAVE_API_KEY=... OPENAI_API_KEY=... \
//! SUPABASE_URL=... SUPABASE_SERVICE_ROLE_KEY=... \
//! hobby_headlines
//! ```
//!
//! ## Architecture
//!
//! The run is a single pass through the pipeline:
//! 1. **Discover**: one search per configured query
//! 2. **Dedupe & bound**: drop within-run repeats, cap the candidate set
//! 3. **Process**: extract → summarize → persist per candidate, with
//!    per-item failure isolation (a bad page never aborts the run)
//!
//! The final line on stdout is the count of newly archived articles.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod error;
mod extract;
mod models;
mod pipeline;
mod search;
mod store;
mod summarize;
mod utils;

use api::ChatCompletions;
use cli::Cli;
use extract::PageExtractor;
use pipeline::Pipeline;
use search::BraveSearch;
use store::SupabaseStore;
use summarize::OpenAiSummarizer;

const API_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("hobby_headlines starting up");

    let args = Cli::parse();
    let queries = args.queries();
    debug!(?queries, max_articles = args.max_articles, model = %args.model, "Parsed configuration");

    // One client per external service; search and store share the plain one.
    let api_client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;

    let search = BraveSearch::new(api_client.clone(), args.brave_api_key.clone());
    let extractor = PageExtractor::new()?;
    let summarizer = OpenAiSummarizer::new(ChatCompletions::new(
        api_client.clone(),
        args.openai_api_key.clone(),
        args.openai_base_url.clone(),
        args.model.clone(),
        summarize::TEMPERATURE,
    ));
    let store = SupabaseStore::new(
        api_client,
        &args.supabase_url,
        args.supabase_service_role_key.clone(),
    );

    let pipeline = Pipeline::new(
        search,
        extractor,
        summarizer,
        store,
        queries,
        args.max_articles,
    );
    let report = pipeline.run().await;

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        inserted = report.inserted,
        duplicates = report.duplicates,
        skipped_short = report.skipped_short,
        failed = report.failed,
        "Execution complete"
    );

    println!("{}", report.inserted);
    Ok(())
}
