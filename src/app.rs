//! Wiring from [`Config`] to running components
//!
//! [`App::from_config`] builds the shared page fetcher, one source adapter
//! per `[[sources]]` entry, one sink per `[[sinks]]` entry, and registers
//! them with the orchestrator and notifier. A sink with `on_update = true`
//! wraps its same-name source in [`Notifying`], so new items are pushed as
//! soon as they are found.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, SinkConfig, SinkKind, SourceConfig, SourceKind};
use crate::pipeline::FetchOrchestrator;
use crate::scheduler::{NotificationScheduler, PollScheduler};
use crate::sinks::{formatter, JsonWebhookSink, PostSink, Sink, WebhookClient};
use crate::sources::{
    FetchOptions, Notifying, PageFetcher, ProductHuntSource, RssSource, SelectorSource, Source,
};
use crate::storage::SnapshotStore;

/// Fully wired pipeline
pub struct App {
    pub store: Arc<SnapshotStore>,
    pub orchestrator: Arc<FetchOrchestrator>,
    pub notifier: NotificationScheduler,
}

impl App {
    /// Build every component described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(
            SnapshotStore::new(&config.fetcher.output_dir).with_context(|| {
                format!(
                    "Failed to open snapshot directory {}",
                    config.fetcher.output_dir.display()
                )
            })?,
        );

        let fetcher = Arc::new(
            PageFetcher::with_options(FetchOptions {
                timeout: config.request_timeout(),
                max_retries: config.fetcher.max_retries,
                requests_per_second: config.fetcher.requests_per_second,
                user_agent: config.fetcher.user_agent.clone(),
                ..FetchOptions::default()
            })
            .context("Failed to create page fetcher")?,
        );

        let mut sinks: HashMap<&str, Arc<dyn Sink>> = HashMap::new();
        let mut notifier = NotificationScheduler::new(Arc::clone(&store));
        for sink_config in &config.sinks {
            let sink = build_sink(sink_config)?;
            if let Some(cron) = &sink_config.cron {
                notifier.add_sink(sink_config.name.clone(), Arc::clone(&sink), cron.clone());
            }
            sinks.insert(sink_config.name.as_str(), sink);
        }

        let mut orchestrator = FetchOrchestrator::new(Arc::clone(&store));
        if let Some(path) = &config.metrics.textfile {
            orchestrator = orchestrator.with_metrics_textfile(path.clone());
        }
        for source_config in &config.sources {
            let mut source = build_source(source_config, &fetcher)?;

            let on_update = config
                .sinks
                .iter()
                .any(|s| s.on_update && s.name == source_config.name);
            if on_update {
                if let Some(sink) = sinks.get(source_config.name.as_str()) {
                    source = Arc::new(Notifying::new(source, Arc::clone(sink)));
                }
            }

            orchestrator.add_source(source_config.name.clone(), source, source_config.target()?);
        }

        tracing::info!(
            sources = orchestrator.len(),
            scheduled_sinks = notifier.len(),
            output_dir = %store.dir().display(),
            "Pipeline assembled"
        );

        Ok(Self {
            store,
            orchestrator: Arc::new(orchestrator),
            notifier,
        })
    }

    /// Poll scheduler driving this app's orchestrator
    pub fn poll_scheduler(&self) -> PollScheduler {
        PollScheduler::new(Arc::clone(&self.orchestrator))
    }
}

/// Build the adapter for one `[[sources]]` entry
pub fn build_source(config: &SourceConfig, fetcher: &Arc<PageFetcher>) -> Result<Arc<dyn Source>> {
    let source: Arc<dyn Source> = match config.kind {
        SourceKind::Rss => Arc::new(RssSource::new(Arc::clone(fetcher))),
        SourceKind::Producthunt => Arc::new(ProductHuntSource::new(Arc::clone(fetcher))),
        SourceKind::Html => {
            let rules = config
                .selectors
                .clone()
                .with_context(|| format!("source '{}': missing selectors", config.name))?;
            let source = SelectorSource::new(Arc::clone(fetcher), rules)
                .with_context(|| format!("source '{}': invalid selectors", config.name))?;
            Arc::new(source)
        }
    };
    Ok(source)
}

/// Build the sink for one `[[sinks]]` entry
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn Sink>> {
    let client = WebhookClient::new(config.webhook_config())
        .with_context(|| format!("sink '{}': failed to create webhook client", config.name))?;

    let mut sink: Box<dyn Sink> = match config.kind {
        SinkKind::Post => {
            let mut post = PostSink::new(config.name.clone(), client).with_layout(config.layout);
            if let Some(max) = config.max_items {
                post = post.with_max_items(max);
            }
            if let Some(locale) = &config.locale {
                post = post.with_locale(locale.clone());
            }
            Box::new(post)
        }
        SinkKind::Json => {
            let mut json = JsonWebhookSink::new(config.name.clone(), client);
            if let Some(max) = config.max_items {
                json = json.with_max_items(max);
            }
            Box::new(json)
        }
    };

    if let Some(name) = &config.formatter {
        let formatter = formatter::by_name(name)
            .with_context(|| format!("sink '{}': unknown formatter '{name}'", config.name))?;
        sink.set_formatter(formatter);
    } else if let Some(pattern) = &config.summary_pattern {
        let re = Regex::new(pattern)
            .with_context(|| format!("sink '{}': invalid summary_pattern", config.name))?;
        sink.set_formatter(formatter::pattern(re));
    }

    Ok(Arc::from(sink))
}
