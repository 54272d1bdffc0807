use anyhow::Result;

use feedrelay::app::App;
use feedrelay::config::Config;
use feedrelay::pipeline::{HookOutcome, SourceOutcome};

/// Run one fetch cycle and print what happened per source
pub async fn fetch(config: Config) -> Result<()> {
    let app = App::from_config(&config)?;

    println!("Fetching {} sources", app.orchestrator.len());
    println!("==================");

    let report = app.orchestrator.run_cycle().await;

    for (name, outcome) in &report.outcomes {
        let line = match outcome {
            SourceOutcome::FetchFailed(reason) => format!("failed: {reason}"),
            SourceOutcome::Unchanged => "unchanged".to_string(),
            SourceOutcome::Updated {
                new_items,
                persisted,
                hook,
            } => {
                let hook = match hook {
                    HookOutcome::Skipped => String::new(),
                    HookOutcome::Completed => ", delivered".to_string(),
                    HookOutcome::Failed(reason) => format!(", delivery failed: {reason}"),
                };
                let saved = if *persisted { "" } else { ", NOT saved" };
                format!("updated, {new_items} new{saved}{hook}")
            }
        };
        println!("  {name}: {line}");
    }

    println!(
        "\n{} updated, {} failed, {} new items in {:.1}s",
        report.updated(),
        report.failed(),
        report.new_items(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
