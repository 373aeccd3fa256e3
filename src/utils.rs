//! Utility functions for string truncation and tab naming.
//!
//! This module provides helper functions used throughout the application:
//! - Character-safe truncation of article bodies
//! - String truncation for logging long API responses
//! - Date formatting for tab names

use chrono::{Local, NaiveDate};

/// Tab name for a date, in `YYYY-MM-DD` format.
pub fn tab_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Today's date in the local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Keep the first `max` characters of `s`.
///
/// Counts Unicode scalar values rather than bytes, so Hangul text is never
/// cut in the middle of a character.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("안녕하세요", 2), "안녕");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Returns
///
/// The original string if it has at most `max` characters, otherwise a
/// truncated version with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        head
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}
