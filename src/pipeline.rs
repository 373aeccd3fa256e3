//! The two batch passes over a dated tab.
//!
//! - [`summarize_articles`]: collect links → fetch each article → skip titles
//!   already in the tab → summarize → append a row with an empty thread.
//! - [`generate_threads`]: read the tab → for each row with a title and no
//!   thread, ask for a thread-style blurb → write it into column 4.
//!
//! Setup failures (link collection, opening the tab, the initial read) abort
//! a pass. Failures for a single article or row are logged and the loop moves
//! on to the next one.

use crate::api::{AskAsync, compose_thread, summarize_article};
use crate::config::ScrapeConfig;
use crate::models::{SummaryRow, THREAD_COLUMN};
use crate::scrapers::{ScrapeError, press};
use crate::sheets::{SheetStore, SheetsError};
use crate::utils::tab_name;
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("link collection failed: {0}")]
    Scrape(#[from] ScrapeError),
    #[error("sheet access failed: {0}")]
    Sheets(#[from] SheetsError),
}

/// Outcome counts for a summarization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SummarizeStats {
    pub links: usize,
    pub appended: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Outcome counts for a thread-generation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThreadStats {
    pub rows: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Summarize every new article on the listing page into the tab for `date`.
#[instrument(level = "info", skip_all, fields(date = %date))]
pub async fn summarize_articles<S, A>(
    http: &reqwest::Client,
    scrape: &ScrapeConfig,
    store: &S,
    api: &A,
    date: NaiveDate,
) -> Result<SummarizeStats, PipelineError>
where
    S: SheetStore,
    A: AskAsync,
{
    let links = press::index_articles(http, scrape).await?;
    let today = tab_name(date);
    let tab = store.get_or_create_tab(&today).await?;

    let mut seen: HashSet<String> = store
        .read_all_rows(&tab)
        .await?
        .into_iter()
        .skip(1)
        .filter_map(|row| row.into_iter().nth(1))
        .collect();
    info!(existing = seen.len(), links = links.len(), "Starting summarization pass");

    let mut stats = SummarizeStats {
        links: links.len(),
        ..Default::default()
    };

    for (i, url) in links.iter().enumerate() {
        info!(index = i + 1, total = links.len(), %url, "Summarizing article");

        let article = match press::fetch_article(http, url, scrape.body_chars).await {
            Ok(article) => article,
            Err(e) => {
                error!(%url, error = %e, "Article fetch failed; skipping");
                stats.failed += 1;
                continue;
            }
        };

        if seen.contains(&article.title) {
            info!(title = %article.title, "Already stored; skipping");
            stats.duplicates += 1;
            continue;
        }

        let summary = match summarize_article(api, &article).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(%url, error = %e, "Summarization request failed; skipping");
                stats.failed += 1;
                continue;
            }
        };
        let row = SummaryRow::new(&today, &article.title, &summary);
        match store.append_row(&tab, &row).await {
            Ok(()) => {
                info!(title = %article.title, "Saved summary row");
                seen.insert(article.title);
                stats.appended += 1;
            }
            Err(e) => {
                error!(%url, error = %e, "Appending row failed; skipping");
                stats.failed += 1;
            }
        }
    }

    info!(?stats, "Summarization pass complete");
    Ok(stats)
}

/// Fill the thread column of every row in the tab for `date` that lacks one.
#[instrument(level = "info", skip_all, fields(date = %date))]
pub async fn generate_threads<S, A>(
    store: &S,
    api: &A,
    date: NaiveDate,
) -> Result<ThreadStats, PipelineError>
where
    S: SheetStore,
    A: AskAsync,
{
    let tab = store.get_or_create_tab(&tab_name(date)).await?;
    let rows = store.read_all_rows(&tab).await?;
    let mut stats = ThreadStats::default();

    // Row 1 is the header; sheet rows are 1-based.
    for (idx, cells) in rows.iter().enumerate().skip(1) {
        let row_number = idx + 1;
        stats.rows += 1;

        let Some(row) = SummaryRow::from_cells(cells) else {
            stats.skipped += 1;
            continue;
        };
        if !row.needs_thread() {
            stats.skipped += 1;
            continue;
        }

        let thread = match compose_thread(api, &row.title).await {
            Ok(thread) => thread,
            Err(e) => {
                warn!(row = row_number, title = %row.title, error = %e, "Thread generation failed; skipping");
                stats.failed += 1;
                continue;
            }
        };

        match store.update_cell(&tab, row_number, THREAD_COLUMN, &thread).await {
            Ok(()) => {
                info!(row = row_number, title = %row.title, "Thread written");
                stats.written += 1;
            }
            Err(e) => {
                warn!(row = row_number, error = %e, "Writing thread failed; skipping");
                stats.failed += 1;
            }
        }
    }

    info!(?stats, "Thread-generation pass complete");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, BackoffPolicy, GeminiClient, GenerateResponse, RetryAsk};
    use crate::config::GeminiConfig;
    use crate::models::{HEADER, SUMMARY_FAILED};
    use crate::sheets::memory::MemorySheets;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DATE: &str = "2025-05-06";

    /// Answers every prompt from a queue and records what it was asked.
    #[derive(Default)]
    struct ScriptedApi {
        replies: Mutex<Vec<Result<serde_json::Value, u16>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn replying(texts: &[&str]) -> Self {
            let replies = texts
                .iter()
                .rev()
                .map(|t| Ok(json!({ "candidates": [{ "content": { "parts": [{ "text": t }] } }] })))
                .collect();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::default(),
            }
        }

        fn with_replies(replies: Vec<Result<serde_json::Value, u16>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::default(),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl AskAsync for ScriptedApi {
        async fn ask(&self, prompt: &str) -> Result<GenerateResponse, ApiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop() {
                Some(Ok(value)) => Ok(serde_json::from_value(value).unwrap()),
                Some(Err(status)) => Err(ApiError::Status {
                    status,
                    body: String::new(),
                }),
                None => panic!("unexpected prompt: {prompt}"),
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn header() -> Vec<String> {
        HEADER.iter().map(|h| h.to_string()).collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    /// Serve a listing page linking to one article per title.
    async fn publisher(titles: &[&str]) -> (MockServer, ScrapeConfig) {
        let server = MockServer::start().await;
        let listing: String = (0..titles.len())
            .map(|i| format!(r#"<a href="/article/015/{i:010}">{i}</a>"#))
            .collect();
        Mock::given(method("GET"))
            .and(path("/press/015/newspaper"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;
        for (i, title) in titles.iter().enumerate() {
            Mock::given(method("GET"))
                .and(path(format!("/article/015/{i:010}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                    r#"<h2 class="media_end_headline">{title}</h2><div id="newsct_article">Body of {title}</div>"#
                )))
                .mount(&server)
                .await;
        }

        let config = ScrapeConfig {
            listing_url: format!("{}/press/015/newspaper", server.uri()),
            link_base_url: server.uri(),
            article_marker: "/article/".to_string(),
            press_marker: "/015/".to_string(),
            max_links: 100,
            body_chars: 2000,
        };
        (server, config)
    }

    #[tokio::test]
    async fn test_summarize_appends_new_articles_to_header_only_tab() {
        let (_server, scrape) = publisher(&["First", "Second"]).await;
        let store = MemorySheets::new().with_tab(DATE, vec![header()]);
        let api = ScriptedApi::replying(&["summary one", "summary two"]);

        let stats = summarize_articles(&reqwest::Client::new(), &scrape, &store, &api, date())
            .await
            .unwrap();

        assert_eq!(
            stats,
            SummarizeStats {
                links: 2,
                appended: 2,
                duplicates: 0,
                failed: 0
            }
        );
        assert_eq!(
            store.rows(DATE).await.unwrap(),
            vec![
                header(),
                row(&[DATE, "First", "summary one", ""]),
                row(&[DATE, "Second", "summary two", ""]),
            ]
        );
        assert!(api.prompts.lock().unwrap()[0].contains("제목: First"));
    }

    #[tokio::test]
    async fn test_summarize_skips_existing_titles() {
        let (_server, scrape) = publisher(&["Old", "New"]).await;
        let store = MemorySheets::new().with_tab(
            DATE,
            vec![header(), row(&[DATE, "Old", "old summary", ""])],
        );
        let api = ScriptedApi::replying(&["new summary"]);

        let stats = summarize_articles(&reqwest::Client::new(), &scrape, &store, &api, date())
            .await
            .unwrap();

        assert_eq!(stats.appended, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(api.calls(), 1);
        let rows = store.rows(DATE).await.unwrap();
        assert_eq!(rows.iter().filter(|r| r[1] == "Old").count(), 1);
        assert_eq!(rows[2], row(&[DATE, "New", "new summary", ""]));
    }

    #[tokio::test]
    async fn test_summarize_dedupes_titles_within_a_run() {
        let (_server, scrape) = publisher(&["Same", "Same"]).await;
        let store = MemorySheets::new();
        let api = ScriptedApi::replying(&["only once"]);

        let stats = summarize_articles(&reqwest::Client::new(), &scrape, &store, &api, date())
            .await
            .unwrap();

        assert_eq!(stats.appended, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(store.rows(DATE).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_summarize_creates_tab_and_continues_past_failures() {
        let (server, scrape) = publisher(&["Good"]).await;
        // A second listed article whose page is gone.
        Mock::given(method("GET"))
            .and(path("/press/015/newspaper"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="/article/015/9999999999">gone</a><a href="/article/015/0000000000">ok</a>"#,
            ))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article/015/9999999999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = MemorySheets::new();
        let api = ScriptedApi::with_replies(vec![Err(500)]);

        let stats = summarize_articles(&reqwest::Client::new(), &scrape, &store, &api, date())
            .await
            .unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.appended, 1);
        assert_eq!(
            store.rows(DATE).await.unwrap(),
            vec![header(), row(&[DATE, "Good", SUMMARY_FAILED, ""])]
        );
    }

    #[tokio::test]
    async fn test_summarize_skips_article_on_undecodable_response() {
        let (server, scrape) = publisher(&["T"]).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;
        let gemini = GeminiConfig {
            endpoint: server.uri(),
            model: "gemini-2.0-flash".to_string(),
            api_key: "k".to_string(),
            backoff: BackoffPolicy {
                attempts: 3,
                delay: Duration::ZERO,
            },
        };
        let api = RetryAsk::new(GeminiClient::new(reqwest::Client::new(), &gemini), gemini.backoff);
        let store = MemorySheets::new().with_tab(DATE, vec![header()]);

        let stats = summarize_articles(&reqwest::Client::new(), &scrape, &store, &api, date())
            .await
            .unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.appended, 0);
        assert_eq!(store.rows(DATE).await.unwrap(), vec![header()]);
    }

    #[tokio::test]
    async fn test_summarize_listing_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let scrape = ScrapeConfig {
            listing_url: server.uri(),
            link_base_url: server.uri(),
            article_marker: "/article/".to_string(),
            press_marker: "/015/".to_string(),
            max_links: 100,
            body_chars: 2000,
        };
        let store = MemorySheets::new();
        let api = ScriptedApi::default();

        let err = summarize_articles(&reqwest::Client::new(), &scrape, &store, &api, date())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Scrape(_)));
        assert!(store.rows(DATE).await.is_none());
    }

    #[tokio::test]
    async fn test_threads_fill_single_blank_row() {
        let store = MemorySheets::new().with_tab(
            DATE,
            vec![header(), row(&[DATE, "Rates held", "summary"])],
        );
        let api = ScriptedApi::replying(&["💰 금리 동결\n물가 부담 속 동결 결정"]);

        let stats = generate_threads(&store, &api, date()).await.unwrap();

        assert_eq!(api.calls(), 1);
        assert!(api.prompts.lock().unwrap()[0].contains("\"Rates held\""));
        assert_eq!(stats.written, 1);
        assert_eq!(
            store.rows(DATE).await.unwrap()[1],
            row(&[DATE, "Rates held", "summary", "💰 금리 동결\n물가 부담 속 동결 결정"])
        );
    }

    #[tokio::test]
    async fn test_threads_never_overwrite_or_touch_blank_titles() {
        let store = MemorySheets::new().with_tab(
            DATE,
            vec![
                header(),
                row(&[DATE, "Done", "s", "existing thread"]),
                row(&[DATE, "  ", "s", ""]),
                row(&[DATE, "short"]),
                row(&[DATE, "Todo", "s", ""]),
            ],
        );
        let api = ScriptedApi::replying(&["new thread"]);

        let stats = generate_threads(&store, &api, date()).await.unwrap();

        assert_eq!(
            stats,
            ThreadStats {
                rows: 4,
                written: 1,
                skipped: 3,
                failed: 0
            }
        );
        let rows = store.rows(DATE).await.unwrap();
        assert_eq!(rows[1][3], "existing thread");
        assert_eq!(rows[2], row(&[DATE, "  ", "s", ""]));
        assert_eq!(rows[4][3], "new thread");
    }

    #[tokio::test]
    async fn test_threads_missing_candidates_skips_row() {
        let store = MemorySheets::new().with_tab(
            DATE,
            vec![
                header(),
                row(&[DATE, "Blocked", "s", ""]),
                row(&[DATE, "Fine", "s", ""]),
            ],
        );
        let api = ScriptedApi::with_replies(vec![
            Ok(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
            Ok(json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] })),
        ]);

        let stats = generate_threads(&store, &api, date()).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 1);
        let rows = store.rows(DATE).await.unwrap();
        assert_eq!(rows[1][3], "");
        assert_eq!(rows[2][3], "ok");
    }
}
