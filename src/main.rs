//! # News Threads
//!
//! A batch pipeline that scrapes one publisher's newspaper listing,
//! summarizes each article through the Gemini API, and keeps the results in
//! a dated tab of a Google Sheet. A second pass turns each stored title into
//! a short social-media "thread" blurb.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... GOOGLE_CREDENTIALS="$(cat key.json)" news_threads
//! ```
//!
//! ## Architecture
//!
//! The application runs two sequential passes against today's tab:
//! 1. **Summarization**: collect article links, fetch each article, skip
//!    titles already in the tab, summarize, append a row
//! 2. **Threads**: for each row with a title and an empty thread cell,
//!    generate a blurb and write it into the thread column
//!
//! Failures during setup (configuration, authorization, opening the
//! spreadsheet, collecting links) end the run. Failures for a single article
//! or row are logged and skipped.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod models;
mod pipeline;
mod scrapers;
mod sheets;
mod utils;

use cli::Cli;
use config::Config;
use sheets::google::GoogleSheets;

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
    info!("news_threads starting up");

    // Before parsing, so clap's env fallbacks see the file's variables.
    config::load_dotenv();

    let args = Cli::parse();
    let config = Config::from_cli(args).inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    info!(
        pass = ?config.pass,
        date = %config.date,
        spreadsheet = %config.sheets.spreadsheet,
        "Configuration loaded"
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()?;

    let store = GoogleSheets::open(http.clone(), &config.sheets)
        .await
        .inspect_err(|e| error!(error = %e, "Could not open spreadsheet"))?;
    let gemini = api::client_from_config(http.clone(), &config.gemini);

    if config.pass.summarizes() {
        let stats = pipeline::summarize_articles(&http, &config.scrape, &store, &gemini, config.date)
            .await
            .inspect_err(|e| error!(error = %e, "Summarization pass aborted"))?;
        info!(
            links = stats.links,
            appended = stats.appended,
            duplicates = stats.duplicates,
            failed = stats.failed,
            "Summarization pass finished"
        );
    }

    if config.pass.threads() {
        let stats = pipeline::generate_threads(&store, &gemini, config.date)
            .await
            .inspect_err(|e| error!(error = %e, "Thread-generation pass aborted"))?;
        info!(
            rows = stats.rows,
            written = stats.written,
            skipped = stats.skipped,
            failed = stats.failed,
            "Thread-generation pass finished"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
