use anyhow::Result;
use std::collections::BTreeMap;

use feedrelay::app::App;
use feedrelay::config::Config;
use feedrelay::scheduler::DeliveryOutcome;

/// Deliver stored snapshots now, to one sink or to all scheduled sinks
pub async fn send(config: Config, sink: Option<String>) -> Result<()> {
    let app = App::from_config(&config)?;

    let outcomes = match sink {
        Some(name) => {
            let Some(outcome) = app.notifier.send_one(&name).await else {
                anyhow::bail!(
                    "no scheduled sink named '{name}' (known: {})",
                    app.notifier.sink_names().join(", ")
                );
            };
            BTreeMap::from([(name, outcome)])
        }
        None => app.notifier.send_all().await,
    };

    let mut failed = 0;
    for (name, outcome) in &outcomes {
        match outcome {
            DeliveryOutcome::Sent(items) => println!("  {name}: sent {items} items"),
            DeliveryOutcome::Skipped => println!("  {name}: nothing to send"),
            DeliveryOutcome::Failed(reason) => {
                failed += 1;
                println!("  {name}: failed: {reason}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} deliveries failed", outcomes.len());
    }
    Ok(())
}
