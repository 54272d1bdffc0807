use anyhow::{Context, Result};

use feedrelay::app::App;
use feedrelay::config::Config;
use feedrelay::error::{Error, FeedRelayErrorTrait};
use feedrelay::scheduler::DeliveryOutcome;

/// Long-running mode: fetch, optionally deliver, then run both schedulers
/// until SIGINT or SIGTERM
pub async fn run(config: Config) -> Result<()> {
    let app = App::from_config(&config)?;

    println!("feedrelay running");
    println!("=================");
    println!("  Sources: {}", app.orchestrator.source_names().join(", "));
    println!("  Scheduled sinks: {}", app.notifier.sink_names().join(", "));
    println!("  Snapshots: {}", app.store.dir().display());
    println!("  Poll interval: {} min", config.fetcher.schedule_minutes);

    let report = app.orchestrator.run_cycle().await;
    println!(
        "  Startup fetch: {} updated, {} failed, {} new items",
        report.updated(),
        report.failed(),
        report.new_items()
    );

    if config.notifier.send_on_startup {
        for (sink, outcome) in app.notifier.send_all().await {
            if let DeliveryOutcome::Failed(reason) = outcome {
                tracing::warn!(sink = %sink, reason = %reason, "Startup delivery failed");
            }
        }
    }

    let poll = app.poll_scheduler();
    if let Err(e) = poll.start(config.fetcher.schedule_minutes) {
        let err = Error::from(e);
        tracing::error!(category = err.category().label(), error = %err, "Polling disabled");
    }

    if let Err(e) = app.notifier.start().await {
        let err = Error::from(e);
        tracing::error!(
            category = err.category().label(),
            recoverable = err.is_recoverable(),
            error = %err,
            "Notification scheduler failed to start"
        );
        poll.stop().await;
        return Err(err).context("Failed to start notification scheduler");
    }

    println!("Press Ctrl+C to stop.\n");
    wait_for_shutdown().await;

    println!("\nShutdown signal received, stopping...");
    poll.stop().await;
    app.notifier.stop().await;

    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = feedrelay::metrics::write_textfile(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    println!("feedrelay stopped.");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!("Failed to install SIGTERM handler: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {
            tracing::info!("SIGTERM received");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
        }
        Err(e) => {
            tracing::error!("Failed to wait for Ctrl+C: {}", e);
        }
    }
}
