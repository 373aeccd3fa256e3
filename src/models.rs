//! Data models for scraped articles and the rows kept in the dated sheet tabs.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: Raw scraped article data, consumed once by the summarizer
//! - [`SummaryRow`]: One row of a dated tab (`date`, `title`, `summary`, `thread`)
//!
//! It also holds the fixed strings written into the sheet: the header row and
//! the placeholders used when a page or a model response is missing content.

/// Header row written when a dated tab is created.
pub const HEADER: [&str; 4] = ["날짜", "제목", "요약", "스레드"];

/// 1-based column index of the thread cell.
pub const THREAD_COLUMN: usize = 4;

/// Title used when neither title selector matches.
pub const MISSING_TITLE: &str = "제목 없음";

/// Body used when neither body selector matches.
pub const MISSING_BODY: &str = "본문 없음";

/// Written in place of a summary when the model returned nothing usable.
pub const SUMMARY_FAILED: &str = "요약 실패";

/// A news article as scraped from the publisher.
///
/// The body is already truncated to the configured character budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// The source URL of the article.
    pub url: String,
    /// The headline, or [`MISSING_TITLE`].
    pub title: String,
    /// The truncated body text, or [`MISSING_BODY`].
    pub body: String,
}

/// One data row of a dated tab.
///
/// Rows are created with an empty thread during the summarization pass and
/// have the thread filled in place by the thread-generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// The tab date in `YYYY-MM-DD` format.
    pub date: String,
    /// The article title; used as the deduplication key within a tab.
    pub title: String,
    /// The model's 3-line summary, or [`SUMMARY_FAILED`].
    pub summary: String,
    /// The promotional blurb, empty until generated.
    pub thread: String,
}

impl SummaryRow {
    /// A freshly summarized row with an empty thread cell.
    pub fn new(date: &str, title: &str, summary: &str) -> Self {
        Self {
            date: date.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            thread: String::new(),
        }
    }

    /// Cell values in sheet column order.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.title.clone(),
            self.summary.clone(),
            self.thread.clone(),
        ]
    }

    /// Build a row from raw cells as read back from the sheet.
    ///
    /// The sheet trims trailing empty cells, so short rows are padded with
    /// empty strings. Returns `None` for rows with fewer than three cells,
    /// which carry no summary to work with.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        if cells.len() < 3 {
            return None;
        }
        Some(Self {
            date: cells[0].clone(),
            title: cells[1].clone(),
            summary: cells[2].clone(),
            thread: cells.get(3).cloned().unwrap_or_default(),
        })
    }

    /// Whether the thread pass still has work to do on this row.
    pub fn needs_thread(&self) -> bool {
        !self.title.trim().is_empty() && self.thread.trim().is_empty()
    }
}
