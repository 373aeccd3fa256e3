//! Publisher scraping: link collection and article extraction.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing**: Collect article URLs from the publisher's newspaper
//!    listing page ([`press::index_articles`])
//! 2. **Fetching**: Download one article page and pull out its title and
//!    body excerpt ([`press::fetch_article`])
//!
//! Content is located with [`ExtractionChain`]s: an ordered list of CSS
//! selectors tried in sequence, where the first selector yielding non-empty
//! text wins and a fixed placeholder covers the case where none do.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

pub mod press;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid link base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Ordered selector fallbacks for one piece of page content.
#[derive(Debug)]
pub struct ExtractionChain {
    selectors: Vec<Selector>,
    placeholder: &'static str,
}

impl ExtractionChain {
    pub fn new(selectors: Vec<Selector>, placeholder: &'static str) -> Self {
        Self {
            selectors,
            placeholder,
        }
    }

    /// Text of the first selector match that is non-empty, else the placeholder.
    pub fn extract(&self, document: &Html) -> String {
        self.selectors
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(element_text)
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| self.placeholder.to_string())
    }
}

/// Whitespace-trimmed text nodes of an element, joined by single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
