//! Newspaper listing scraper for a single press outlet.
//!
//! The listing page (by default `https://media.naver.com/press/015/newspaper`)
//! links every article in today's print edition. Article links are kept when
//! they contain both the article path marker (`/article/`) and the press id
//! marker (`/015/`); relative links are resolved against the link base URL
//! (`https://n.news.naver.com`).
//!
//! Article pages carry the headline in `h2.media_end_headline` and the body
//! in `div#newsct_article`; older layouts fall back to `<title>` and
//! `div.article-content`.

use super::{ExtractionChain, ScrapeError};
use crate::config::ScrapeConfig;
use crate::models::{Article, MISSING_BODY, MISSING_TITLE};
use crate::utils::truncate_chars;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a[href]"));

static TITLE: Lazy<ExtractionChain> = Lazy::new(|| {
    ExtractionChain::new(
        vec![selector("h2.media_end_headline"), selector("title")],
        MISSING_TITLE,
    )
});

static BODY: Lazy<ExtractionChain> = Lazy::new(|| {
    ExtractionChain::new(
        vec![selector("div#newsct_article"), selector("div.article-content")],
        MISSING_BODY,
    )
});

// Only called with the literals above, all covered by tests.
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

/// Extract article URLs from listing HTML.
///
/// Keeps anchors whose `href` contains both markers, resolves them against
/// the base URL, drops repeats (first occurrence wins), and caps the result
/// at `max_links`.
pub fn collect_links(html: &str, config: &ScrapeConfig) -> Result<Vec<String>, ScrapeError> {
    let base = Url::parse(&config.link_base_url)?;
    let document = Html::parse_document(html);

    let links = document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(&config.article_marker) && href.contains(&config.press_marker))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .unique()
        .take(config.max_links)
        .collect();

    Ok(links)
}

/// Build an [`Article`] from a fetched page.
///
/// Never fails: missing content is replaced with placeholders. The body is
/// cut to `body_chars` characters.
pub fn parse_article(url: &str, html: &str, body_chars: usize) -> Article {
    let document = Html::parse_document(html);
    let title = TITLE.extract(&document);
    let body = BODY.extract(&document);

    Article {
        url: url.to_string(),
        title,
        body: truncate_chars(&body, body_chars),
    }
}

/// Fetch the listing page and return the article URLs on it.
#[instrument(level = "info", skip_all, fields(listing = %config.listing_url))]
pub async fn index_articles(
    http: &reqwest::Client,
    config: &ScrapeConfig,
) -> Result<Vec<String>, ScrapeError> {
    let html = http
        .get(&config.listing_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let urls = collect_links(&html, config)?;

    info!(count = urls.len(), "Indexed article URLs");
    debug!(urls = ?urls, "Article URLs");
    Ok(urls)
}

/// Fetch a single article page.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_article(
    http: &reqwest::Client,
    url: &str,
    body_chars: usize,
) -> Result<Article, ScrapeError> {
    let html = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let article = parse_article(url, &html, body_chars);

    debug!(title = %article.title, chars = article.body.chars().count(), "Parsed article");
    Ok(article)
}
