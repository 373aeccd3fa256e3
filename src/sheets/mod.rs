//! Tabular store for dated summary tabs.
//!
//! A spreadsheet document holds one tab per calendar date. Each tab starts
//! with the [`HEADER`](crate::models::HEADER) row followed by one
//! [`SummaryRow`] per article. The store exposes exactly the four operations
//! the pipeline needs through [`SheetStore`]:
//!
//! | Operation | Remote calls |
//! |-----------|--------------|
//! | [`get_or_create_tab`](SheetStore::get_or_create_tab) | metadata read, plus add-sheet and header append on first use |
//! | [`read_all_rows`](SheetStore::read_all_rows) | one values read |
//! | [`append_row`](SheetStore::append_row) | one values append |
//! | [`update_cell`](SheetStore::update_cell) | one values update |
//!
//! There are no transactions; this process is assumed to be the only writer
//! during a run.

use crate::models::{HEADER, SummaryRow};
use thiserror::Error;

pub mod auth;
pub mod google;
#[cfg(test)]
pub mod memory;

/// Rows allocated for a new tab.
pub const TAB_ROWS: u32 = 1000;
/// Columns allocated for a new tab.
pub const TAB_COLUMNS: u32 = 10;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("failed to sign service-account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("spreadsheet {0:?} not found or not shared with the service account")]
    SpreadsheetNotFound(String),
    #[error("unexpected response: {0}")]
    Malformed(&'static str),
}

/// A dated tab inside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub title: String,
    pub sheet_id: i64,
}

/// Remote spreadsheet operations used by the pipeline.
///
/// Row and column indexes are 1-based, matching the sheet's own numbering;
/// row 1 is the header.
pub trait SheetStore {
    /// Open the tab called `name`, creating it with a header row if absent.
    async fn get_or_create_tab(&self, name: &str) -> Result<Tab, SheetsError>;

    /// Every row of the tab, header included.
    async fn read_all_rows(&self, tab: &Tab) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Append a row after the last non-empty row.
    async fn append_row(&self, tab: &Tab, row: &SummaryRow) -> Result<(), SheetsError>;

    /// Overwrite a single cell.
    async fn update_cell(
        &self,
        tab: &Tab,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), SheetsError>;
}

/// Pad rows with empty cells to a common width.
///
/// The values API drops trailing empty cells, so a row with a blank summary
/// comes back shorter than the header. Rows are widened to the widest row or
/// the header, whichever is wider.
pub fn pad_rows(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(HEADER.len());
    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}

/// A1 column letters for a 1-based column index (`1` → `A`, `27` → `AA`).
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a tab title for use in an A1 range.
pub fn quote_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
