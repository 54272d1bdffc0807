//! Webhook transport and the plain JSON webhook sink
//!
//! [`WebhookClient`] POSTs JSON payloads with optional bearer
//! authentication, custom headers, a request timeout and retry with
//! exponential backoff. Client errors (4xx) are never retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::{Formatter, Sink, SinkError, SinkResult};
use crate::models::Feed;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Webhook endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL endpoint
    pub url: String,
    /// Optional authentication token (sent as Bearer token)
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Custom headers to include in requests
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retry attempts on failure
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    1000
}

impl WebhookConfig {
    /// Create a new webhook configuration
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            headers: HashMap::new(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            retry_base_ms: default_retry_base_ms(),
        }
    }

    /// Set authentication token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set retry policy
    pub fn with_retries(mut self, max_retries: u32, retry_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_base_ms = retry_base_ms;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Webhook URL cannot be empty".to_string());
        }

        let parsed = url::Url::parse(&self.url).map_err(|e| format!("Invalid webhook URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err("Webhook URL must start with http:// or https://".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// JSON-over-HTTP POST client shared by the webhook sinks
pub struct WebhookClient {
    config: WebhookConfig,
    client: Client,
    retry: RetryConfig,
}

impl WebhookClient {
    /// Create a client after validating the configuration
    pub fn new(config: WebhookConfig) -> SinkResult<Self> {
        config.validate().map_err(SinkError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let retry = RetryConfig::with_delays(
            config.max_retries,
            config.retry_base_ms,
            config.retry_base_ms.saturating_mul(30),
        );

        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Create a client with default settings for a URL
    pub fn from_url(url: impl Into<String>) -> SinkResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    /// Webhook URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// POST a JSON payload, returning the decoded response body
    ///
    /// A non-JSON body decodes to `Value::Null`. A JSON body carrying a
    /// non-zero integer `code` is reported as [`SinkError::Rejected`].
    pub async fn post_json(&self, payload: &serde_json::Value) -> SinkResult<serde_json::Value> {
        with_retry_if(
            &self.retry,
            || self.post_once(payload),
            SinkError::is_retryable,
        )
        .await
    }

    async fn post_once(&self, payload: &serde_json::Value) -> SinkResult<serde_json::Value> {
        let mut request = self.client.post(&self.config.url);

        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if let Some(code) = decoded.get("code").and_then(|c| c.as_i64()) {
            if code != 0 {
                let message = decoded
                    .get("msg")
                    .and_then(|m| m.as_str())
                    .unwrap_or_default()
                    .to_string();
                return Err(SinkError::Rejected { code, message });
            }
        }

        tracing::debug!(url = %self.config.url, status = status.as_u16(), "Webhook delivered");
        Ok(decoded)
    }
}

/// Sink that posts the feed as a plain JSON document
///
/// # Payload Format
///
/// ```json
/// {
///   "source": "hn",
///   "title": "Hacker News",
///   "description": "...",
///   "last_updated": "2024-01-01T12:00:00Z",
///   "items": [{ "title": "...", "link": "...", "published": "...", "summary": "...", "description": "..." }]
/// }
/// ```
pub struct JsonWebhookSink {
    name: String,
    client: WebhookClient,
    max_items: Option<usize>,
    formatter: Option<Formatter>,
}

impl JsonWebhookSink {
    pub fn new(name: impl Into<String>, client: WebhookClient) -> Self {
        Self {
            name: name.into(),
            client,
            max_items: None,
            formatter: None,
        }
    }

    /// Cap the number of items per delivery
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    fn build_payload(&self, feed: &Feed) -> serde_json::Value {
        let mut feed = match self.max_items {
            Some(limit) => feed.truncated(limit),
            None => feed.clone(),
        };
        if let Some(formatter) = &self.formatter {
            formatter(&mut feed);
        }

        serde_json::json!({
            "source": self.name,
            "title": feed.title,
            "description": feed.description,
            "last_updated": feed.last_updated.to_rfc3339(),
            "items": feed.items,
        })
    }
}

#[async_trait]
impl Sink for JsonWebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, feed: &Feed) -> SinkResult<()> {
        let payload = self.build_payload(feed);
        self.client.post_json(&payload).await?;
        tracing::info!(
            sink = %self.name,
            url = %self.client.url(),
            items = payload["items"].as_array().map_or(0, Vec::len),
            "JSON webhook delivered"
        );
        Ok(())
    }

    fn set_formatter(&mut self, formatter: Formatter) {
        self.formatter = Some(formatter);
    }
}
