//! HTTP page fetcher with rate limiting and retry
//!
//! Shared transport for every source kind:
//! - Rate limiting with governor
//! - Automatic retry with exponential backoff on timeouts and 429/5xx
//! - Configurable timeout and User-Agent, gzip support

use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client, Response,
};
use std::num::NonZeroU32;
use std::time::Duration;

/// Transport settings for [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout
    pub timeout: Duration,

    /// Maximum number of retry attempts for failed requests
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub backoff_base_ms: u64,

    /// Maximum number of requests per second across all sources
    pub requests_per_second: u32,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_base_ms: 1000,
            requests_per_second: 5,
            user_agent: format!("feedrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Rate-limited HTTP GET client used by all sources
pub struct PageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Backoff policy
    retry: RetryConfig,

    /// Default headers sent with every request
    headers: HeaderMap,
}

impl PageFetcher {
    /// Create a fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(FetchOptions::default())
    }

    /// Create a fetcher with custom transport settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_options(options: FetchOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(options.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry: RetryConfig::with_delays(
                options.max_retries,
                options.backoff_base_ms,
                options.backoff_base_ms.saturating_mul(30),
            ),
            headers: Self::build_headers(&options.user_agent),
        })
    }

    /// Fetch a page as text
    ///
    /// # Errors
    ///
    /// Returns `FetchError::ServerError` for non-retryable statuses and
    /// `FetchError::MaxRetriesExceeded` once retries are exhausted
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// Fetch a document as raw bytes
    ///
    /// # Errors
    ///
    /// Same as [`PageFetcher::fetch_text`]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        self.rate_limiter.until_ready().await;

        let result = with_retry_if(
            &self.retry,
            || self.send_once(url),
            FetchError::is_retryable,
        )
        .await;

        match result {
            Ok(response) => Ok(response),
            Err(e) if e.is_retryable() => {
                tracing::warn!(url = url, error = %e, "Giving up after retries");
                Err(FetchError::MaxRetriesExceeded)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_once(&self, url: &str) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(FetchError::ServerError(status.as_u16()))
        }
    }

    fn build_headers(user_agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/html;q=0.8,*/*;q=0.5",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        headers
    }
}
