//! Command-line interface definitions for Hobby Headlines.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials can be provided via command-line flags or environment
//! variables; a missing credential is a startup error and the run never
//! begins. The parsed [`Cli`] struct is the run's whole configuration,
//! constructed once in `main` and passed by reference to each component
//! constructor.

use crate::pipeline::DEFAULT_MAX_ARTICLES;
use clap::Parser;

/// Search queries used when none are given on the command line.
pub const DEFAULT_QUERIES: [&str; 5] = [
    "trading cards hobby news",
    "sports cards grading PSA Beckett SGC",
    "pokemon tcg market news",
    "one piece tcg market news",
    "Whatnot trading cards news",
];

/// Command-line arguments for the Hobby Headlines ingestion run.
///
/// # Examples
///
/// ```sh
/// # Credentials from the environment
/// hobby_headlines
///
/// # Override the query list and cap
/// hobby_headlines -q "vintage baseball cards auction" --max-articles 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Brave web-search API subscription token
    #[arg(long, env = "BRAVE_API_KEY", hide_env_values = true)]
    pub brave_api_key: String,

    /// OpenAI API key for the summarization model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Supabase project base URL (e.g. https://xyzcompany.supabase.co)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Supabase service-role key used for the articles table
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_service_role_key: String,

    /// Search query; repeat for multiple. Defaults to the built-in hobby list.
    #[arg(short, long = "query")]
    pub queries: Vec<String>,

    /// Maximum number of candidates processed per run
    #[arg(long, default_value_t = DEFAULT_MAX_ARTICLES)]
    pub max_articles: usize,

    /// Chat-completion model used for summaries
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,
}

impl Cli {
    /// The queries for this run: the `-q` flags, or the default list.
    pub fn queries(&self) -> Vec<String> {
        if self.queries.is_empty() {
            DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
        } else {
            self.queries.clone()
        }
    }
}
