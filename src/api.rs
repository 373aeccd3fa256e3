//! Gemini API interaction with rate-limit retry logic.
//!
//! This module provides the interface for communicating with the Gemini
//! `generateContent` endpoint. It includes a fixed-delay retry policy for
//! HTTP 429 responses; every other failure is returned immediately.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`AskAsync`]: Core trait defining a single async generation request
//! - [`GeminiClient`]: One HTTP round-trip to the API
//! - [`RetryAsk`]: Decorator that retries rate-limited requests according to
//!   a [`BackoffPolicy`], sleeping through an injectable [`Sleep`]
//!
//! Two call sites sit on top: [`summarize_article`] asks for a 3-line
//! summary and falls back to [`SUMMARY_FAILED`] when the model answers
//! without one (transport failures are returned), and [`compose_thread`] asks
//! for a short social-post rephrasing of a title.

use crate::config::GeminiConfig;
use crate::models::{Article, SUMMARY_FAILED};
use crate::utils::truncate_for_log;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Errors from a generation request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("retries exceeded after {attempts} rate-limited attempts")]
    RetriesExceeded { attempts: usize },
    #[error("response has no candidates text")]
    MissingCandidates,
}

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize, Debug)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

/// A successful `generateContent` response.
#[derive(Deserialize, Debug, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize, Debug)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Trimmed text of `candidates[0].content.parts[0].text`.
    pub fn text(&self) -> Result<String, ApiError> {
        self.candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .map(|t| t.trim().to_string())
            .ok_or(ApiError::MissingCandidates)
    }
}

/// Trait for a single async generation request.
///
/// Implementors send a prompt to the model and return the parsed response.
/// This abstraction allows decorators like [`RetryAsk`] to wrap the HTTP
/// client.
pub trait AskAsync {
    async fn ask(&self, prompt: &str) -> Result<GenerateResponse, ApiError>;
}

/// Fixed-delay retry policy for rate-limited requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts, including the first.
    pub attempts: usize,
    /// Wait after every rate-limited attempt, the last one included.
    pub delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(60),
        }
    }
}

/// Something that can wait. Swapped out in tests so backoff is instant.
pub trait Sleep {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Single-attempt HTTP client for `models/{model}:generateContent`.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: &GeminiConfig) -> Self {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            config.endpoint.trim_end_matches('/'),
            config.model,
            urlencoding::encode(&config.api_key)
        );
        Self { http, url }
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // url carries the API key
        f.debug_struct("GeminiClient").finish_non_exhaustive()
    }
}

impl AskAsync for GeminiClient {
    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<GenerateResponse, ApiError> {
        let t0 = Instant::now();
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let res = self.http.post(&self.url).json(&body).send().await?;
        let status = res.status();
        debug!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "generateContent responded");

        match status {
            StatusCode::OK => Ok(res.json::<GenerateResponse>().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            _ => {
                let body = res.text().await.unwrap_or_default();
                error!(status = status.as_u16(), body = %truncate_for_log(&body, 300), "API error");
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

/// Wrapper that retries rate-limited requests of any [`AskAsync`] implementation.
///
/// Only [`ApiError::RateLimited`] is retried; each one is followed by the
/// policy delay. A success or any other error short-circuits the loop. Once
/// every attempt was rate limited the result is [`ApiError::RetriesExceeded`].
pub struct RetryAsk<T, S = TokioSleep> {
    inner: T,
    policy: BackoffPolicy,
    sleeper: S,
}

impl<T> RetryAsk<T, TokioSleep>
where
    T: AskAsync,
{
    pub fn new(inner: T, policy: BackoffPolicy) -> Self {
        Self::with_sleeper(inner, policy, TokioSleep)
    }
}

impl<T, S> RetryAsk<T, S>
where
    T: AskAsync,
    S: Sleep,
{
    pub fn with_sleeper(inner: T, policy: BackoffPolicy, sleeper: S) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }
}

impl<T, S> fmt::Debug for RetryAsk<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("attempts", &self.policy.attempts)
            .field("delay", &self.policy.delay)
            .finish()
    }
}

impl<T, S> AskAsync for RetryAsk<T, S>
where
    T: AskAsync,
    S: Sleep,
{
    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<GenerateResponse, ApiError> {
        let total_t0 = Instant::now();
        // At least one request goes out even for a zero-attempt policy.
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            match self.inner.ask(prompt).await {
                Err(ApiError::RateLimited) => {
                    warn!(
                        attempt,
                        max = attempts,
                        delay_secs = self.policy.delay.as_secs(),
                        "429 rate limited; waiting"
                    );
                    self.sleeper.sleep(self.policy.delay).await;
                }
                other => return other,
            }
        }

        error!(
            attempts,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "generateContent exhausted retries"
        );
        Err(ApiError::RetriesExceeded { attempts })
    }
}

/// Build the production client: HTTP round-trips wrapped in the retry policy.
pub fn client_from_config(http: reqwest::Client, config: &GeminiConfig) -> RetryAsk<GeminiClient> {
    RetryAsk::new(GeminiClient::new(http, config), config.backoff)
}

pub fn summary_prompt(title: &str, body: &str) -> String {
    format!("아래 기사의 제목과 본문을 3줄로 요약해줘.\n\n제목: {title}\n본문: {body}")
}

pub fn thread_prompt(title: &str) -> String {
    format!(
        "다음 기사 제목을 보고, 사람들이 흥미롭게 느낄 수 있도록 짧은 트위터(스레드) 스타일 단문으로 바꿔줘. \
         (예: 🪖 러시아, 우크라 재공격)\n\
         형식: 첫 문장은 이모지를 넣어 제목을 변형해서 작성하고, 한 줄 간격 없이 바로 이어서 본문을 작성해줘. \
         본문은 이모지 없이 제목보다 조금 긴 간결한 단문으로 작성해줘. \
         (예: 휴전 협상 교착 속 군사 공격 재개… 유럽은 군사지원 확대 검토)\n\
         기사 제목: \"{title}\"\n\
         트위터 스레드 스타일로 작성해줘:"
    )
}

/// Ask for a 3-line summary of an article.
///
/// An error status, exhausted retries, or a response without candidate text
/// yields [`SUMMARY_FAILED`]. Transport and decode failures are returned so
/// the caller can skip the article and retry it on a later run.
#[instrument(level = "info", skip_all, fields(url = %article.url))]
pub async fn summarize_article<A: AskAsync>(
    api: &A,
    article: &Article,
) -> Result<String, ApiError> {
    let t0 = Instant::now();
    let res = api
        .ask(&summary_prompt(&article.title, &article.body))
        .await
        .and_then(|r| r.text());

    match res {
        Ok(summary) => {
            debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Summary generated");
            Ok(summary)
        }
        Err(e @ ApiError::Transport(_)) => Err(e),
        Err(e) => {
            warn!(error = %e, "Summarization failed; storing sentinel");
            Ok(SUMMARY_FAILED.to_string())
        }
    }
}

/// Ask for a thread-style rephrasing of a title.
#[instrument(level = "info", skip_all)]
pub async fn compose_thread<A: AskAsync>(api: &A, title: &str) -> Result<String, ApiError> {
    api.ask(&thread_prompt(title)).await?.text()
}
