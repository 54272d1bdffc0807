//! Configuration management for feedrelay
//!
//! Configuration comes from a TOML file, with a handful of settings
//! overridable from the environment. Sources and sinks are declared as
//! `[[sources]]` and `[[sinks]]` tables:
//!
//! ```toml
//! [fetcher]
//! schedule_minutes = 30
//! output_dir = "data"
//!
//! [[sources]]
//! name = "producthunt"
//! kind = "producthunt"
//! template = "https://decohack.com/producthunt-daily-{{date}}/"
//! date_format = "%Y-%m-%d"
//!
//! [[sinks]]
//! name = "producthunt"
//! kind = "post"
//! webhook_url = "https://open.example.com/hook/${PH_HOOK}"
//! layout = "digest"
//! cron = "0 30 1 * * *"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::{FeedTarget, DATE_PLACEHOLDER};
use crate::sinks::{formatter, PostLayout, WebhookConfig};
use crate::sources::SelectorRules;
use crate::utils::expand_env;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Fetch cycle and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Minutes between fetch cycles; non-positive values disable polling
    pub schedule_minutes: i64,

    /// Directory holding one JSON snapshot per source
    pub output_dir: PathBuf,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retry attempts for retryable fetch failures
    pub max_retries: u32,

    /// Rate limit across all sources (requests per second)
    pub requests_per_second: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            schedule_minutes: 30,
            output_dir: PathBuf::from("data"),
            request_timeout_secs: 30,
            max_retries: 3,
            requests_per_second: 5,
            user_agent: format!("feedrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Deliver every sink's snapshot once right after the startup fetch
    pub send_on_startup: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Metrics export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus textfile written after each cycle and at shutdown
    pub textfile: Option<PathBuf>,
}

/// Kind of source adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Producthunt,
    Html,
}

/// One `[[sources]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique name, also the snapshot file stem
    pub name: String,

    pub kind: SourceKind,

    /// Fixed URL
    #[serde(default)]
    pub url: Option<String>,

    /// URL template containing `{{date}}`
    #[serde(default)]
    pub template: Option<String>,

    /// strftime format for `{{date}}`
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Required for `html` sources
    #[serde(default)]
    pub selectors: Option<SelectorRules>,
}

fn default_date_format() -> String {
    String::from("%Y-%m-%d")
}

impl SourceConfig {
    /// Where this source fetches from
    pub fn target(&self) -> Result<FeedTarget> {
        match (&self.url, &self.template) {
            (Some(url), None) => Ok(FeedTarget::fixed(url.clone())),
            (None, Some(template)) => Ok(FeedTarget::dated(
                template.clone(),
                self.date_format.clone(),
            )),
            (Some(_), Some(_)) => {
                anyhow::bail!("source '{}': set either url or template, not both", self.name)
            }
            (None, None) => anyhow::bail!("source '{}': url or template is required", self.name),
        }
    }
}

/// Kind of sink adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Post,
    Json,
}

/// One `[[sinks]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Unique name; scheduled delivery reads the snapshot of the same name
    pub name: String,

    #[serde(default)]
    pub kind: SinkKind,

    /// Webhook endpoint; `${VAR}` references are expanded
    pub webhook_url: String,

    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Row layout for `post` sinks
    #[serde(default)]
    pub layout: PostLayout,

    #[serde(default)]
    pub max_items: Option<usize>,

    /// Scheduled delivery; five or six cron fields, UTC
    #[serde(default)]
    pub cron: Option<String>,

    /// Deliver new items as soon as the same-name source finds them
    #[serde(default)]
    pub on_update: bool,

    /// Built-in formatter name
    #[serde(default)]
    pub formatter: Option<String>,

    /// Regex formatter applied to item summaries
    #[serde(default)]
    pub summary_pattern: Option<String>,

    /// Locale key of the post body
    #[serde(default)]
    pub locale: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl SinkConfig {
    /// Webhook URL with environment references expanded
    pub fn resolved_webhook_url(&self) -> String {
        expand_env(&self.webhook_url)
    }

    /// Transport settings for this sink
    pub fn webhook_config(&self) -> WebhookConfig {
        let mut config = WebhookConfig::new(self.resolved_webhook_url());

        if let Some(token) = &self.auth_token {
            config = config.with_auth_token(expand_env(token));
        }
        for (key, value) in &self.headers {
            config = config.with_header(key.clone(), value.clone());
        }
        if let Some(timeout) = self.timeout_secs {
            config = config.with_timeout(timeout);
        }
        if let Some(retries) = self.max_retries {
            let base_ms = config.retry_base_ms;
            config = config.with_retries(retries, base_ms);
        }
        config
    }
}

impl Config {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `FEEDRELAY_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("FEEDRELAY_OUTPUT_DIR") {
            self.fetcher.output_dir = PathBuf::from(dir);
        }

        if let Ok(minutes) = std::env::var("FEEDRELAY_SCHEDULE_MINUTES") {
            self.fetcher.schedule_minutes = minutes
                .trim()
                .parse()
                .with_context(|| format!("FEEDRELAY_SCHEDULE_MINUTES is not a number: {minutes}"))?;
        }

        if let Ok(level) = std::env::var("FEEDRELAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("FEEDRELAY_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    ///
    /// The poll interval is deliberately not checked here; the poll
    /// scheduler rejects a non-positive interval on its own and the rest of
    /// the process keeps running.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.fetcher.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json', got '{}'", self.logging.format);
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                anyhow::bail!("source name must not be empty");
            }
            if !names.insert(source.name.as_str()) {
                anyhow::bail!("duplicate source name '{}'", source.name);
            }
            self.validate_source(source)?;
        }

        let mut sink_names = HashSet::new();
        for sink in &self.sinks {
            if sink.name.trim().is_empty() {
                anyhow::bail!("sink name must not be empty");
            }
            if !sink_names.insert(sink.name.as_str()) {
                anyhow::bail!("duplicate sink name '{}'", sink.name);
            }
            self.validate_sink(sink, &names)?;
        }

        Ok(())
    }

    fn validate_source(&self, source: &SourceConfig) -> Result<()> {
        match source.target()? {
            FeedTarget::Static(url) => {
                url::Url::parse(&url)
                    .with_context(|| format!("source '{}': invalid url '{url}'", source.name))?;
            }
            FeedTarget::Dated {
                template,
                date_format,
            } => {
                if !template.contains(DATE_PLACEHOLDER) {
                    anyhow::bail!(
                        "source '{}': template has no {DATE_PLACEHOLDER} placeholder",
                        source.name
                    );
                }
                if !is_valid_strftime(&date_format) {
                    anyhow::bail!(
                        "source '{}': invalid date_format '{date_format}'",
                        source.name
                    );
                }
            }
        }

        if source.kind == SourceKind::Html && source.selectors.is_none() {
            anyhow::bail!("source '{}': html sources need [selectors]", source.name);
        }

        Ok(())
    }

    fn validate_sink(&self, sink: &SinkConfig, source_names: &HashSet<&str>) -> Result<()> {
        sink.webhook_config()
            .validate()
            .map_err(|reason| anyhow::anyhow!("sink '{}': {reason}", sink.name))?;

        if sink.cron.is_none() && !sink.on_update {
            anyhow::bail!(
                "sink '{}': set a cron schedule, on_update = true, or both",
                sink.name
            );
        }

        if sink.on_update && !source_names.contains(sink.name.as_str()) {
            anyhow::bail!(
                "sink '{}': on_update needs a source with the same name",
                sink.name
            );
        }

        if sink.max_items == Some(0) {
            anyhow::bail!("sink '{}': max_items must be greater than 0", sink.name);
        }

        match (&sink.formatter, &sink.summary_pattern) {
            (Some(_), Some(_)) => anyhow::bail!(
                "sink '{}': set either formatter or summary_pattern, not both",
                sink.name
            ),
            (Some(name), None) if formatter::by_name(name).is_none() => {
                anyhow::bail!("sink '{}': unknown formatter '{name}'", sink.name)
            }
            (None, Some(pattern)) => {
                regex::Regex::new(pattern)
                    .with_context(|| format!("sink '{}': invalid summary_pattern", sink.name))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetcher.request_timeout_secs)
    }

    /// Look up a source entry by name
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

fn is_valid_strftime(format: &str) -> bool {
    use chrono::format::{Item, StrftimeItems};

    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
