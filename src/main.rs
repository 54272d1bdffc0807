use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use feedrelay::config::Config;

#[derive(Parser)]
#[command(
    name = "feedrelay",
    version,
    about = "Incremental feed fetcher with scheduled webhook delivery",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch once, then poll and deliver on schedule until interrupted
    Run,

    /// Run a single fetch cycle
    Fetch,

    /// Deliver stored snapshots immediately
    Send {
        /// Only this sink
        #[arg(short, long)]
        sink: Option<String>,
    },

    /// Print a stored snapshot
    Show {
        /// Source name
        source: String,

        /// Print raw JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = feedrelay::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    tracing::info!(config = %cli.config.display(), "feedrelay starting");

    match cli.command {
        Commands::Run => {
            tracing::info!(
                schedule_minutes = config.fetcher.schedule_minutes,
                sources = config.sources.len(),
                sinks = config.sinks.len(),
                "Starting run command"
            );
            commands::run(config).await?;
        }

        Commands::Fetch => {
            tracing::info!(sources = config.sources.len(), "Starting fetch command");
            commands::fetch(config).await?;
        }

        Commands::Send { sink } => {
            tracing::info!(sink = ?sink, "Starting send command");
            commands::send(config, sink).await?;
        }

        Commands::Show { source, json } => {
            commands::show(config, source, json)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("feedrelay=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("feedrelay={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
