//! Command-line interface definitions for News Threads.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via command-line flags or environment variables;
//! everything else has a default matching the production setup, so a bare
//! invocation runs both passes against today's tab.

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

/// Which passes a run performs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Pass {
    /// Summarize new articles, then generate threads.
    #[default]
    All,
    /// Only scrape, summarize, and append new rows.
    Summarize,
    /// Only fill missing thread cells.
    Threads,
}

impl Pass {
    pub fn summarizes(self) -> bool {
        matches!(self, Pass::All | Pass::Summarize)
    }

    pub fn threads(self) -> bool {
        matches!(self, Pass::All | Pass::Threads)
    }
}

/// Command-line arguments for the News Threads application.
///
/// # Examples
///
/// ```sh
/// # Both passes against today's tab, secrets from the environment
/// news_threads
///
/// # Back-fill threads for an earlier day
/// news_threads --pass threads --date 2025-05-06
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Which passes to run
    #[arg(long, value_enum, default_value_t = Pass::All)]
    pub pass: Pass,

    /// Tab date (YYYY-MM-DD); defaults to today in local time
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Newspaper listing page to collect article links from
    #[arg(long, default_value = "https://media.naver.com/press/015/newspaper")]
    pub listing_url: String,

    /// Base URL prefixed to relative article links
    #[arg(long, default_value = "https://n.news.naver.com")]
    pub link_base_url: String,

    /// Path fragment every article link must contain
    #[arg(long, default_value = "/article/")]
    pub article_marker: String,

    /// Publisher-id fragment every article link must contain
    #[arg(long, default_value = "/015/")]
    pub press_marker: String,

    /// Maximum number of article links processed per run
    #[arg(long, default_value_t = 100)]
    pub max_links: usize,

    /// Number of body characters sent to the summarizer
    #[arg(long, default_value_t = 2000)]
    pub body_chars: usize,

    /// Name of the spreadsheet document holding the dated tabs
    #[arg(long, default_value = "n2")]
    pub spreadsheet: String,

    /// Service-account credential JSON for Google Sheets
    #[arg(long, env = "GOOGLE_CREDENTIALS", hide_env_values = true)]
    pub google_credentials: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Base URL of the generative language API
    #[arg(long, default_value = "https://generativelanguage.googleapis.com/v1beta")]
    pub gemini_endpoint: String,

    /// Gemini model name
    #[arg(long, default_value = "gemini-2.0-flash")]
    pub model: String,

    /// Attempts per generation request while rate limited (at least 1)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub retry_attempts: u32,

    /// Seconds to wait after a rate-limited response
    #[arg(long, default_value_t = 60)]
    pub retry_delay_secs: u64,
}
