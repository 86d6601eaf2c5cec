use alliant_energy::cache::{CredentialStore, FileStore};
use alliant_energy::client::AlliantClient;
use alliant_energy::config::Config;
use alliant_energy::logging::init_logging;
use alliant_energy::poller::UsagePoller;
use alliant_energy::sensors::readings;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!(
        "Alliant Energy poller {} starting up",
        env!("APP_VERSION")
    );

    let store: Option<Arc<dyn CredentialStore>> = if config.cache.enabled {
        let store = FileStore::for_installation(&config.cache.directory, &config.account.installation_id);
        info!("Caching session in {}", store.path().display());
        Some(Arc::new(store))
    } else {
        None
    };

    let tz = config.tz()?;
    let client = AlliantClient::new(&config, store)
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;
    let mut poller = UsagePoller::new(client, Duration::from_secs(config.poll.interval_seconds));

    if config.poll.run_once {
        let outcome = poller.refresh().await;
        poller.close().await;
        let snapshot = outcome.map_err(|e| anyhow::anyhow!("Fetch failed: {}", e))?;
        let output = serde_json::to_string_pretty(&readings(&snapshot, tz))
            .context("Failed to render readings")?;
        println!("{}", output);
        return Ok(());
    }

    // Log every published snapshot
    let mut updates = poller.subscribe();
    let reporter = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let latest = updates.borrow_and_update().clone();
            if let Some(snapshot) = latest {
                for reading in readings(&snapshot, tz) {
                    info!("{} = {:?} {}", reading.key, reading.value, reading.unit.unwrap_or(""));
                }
            }
        }
    });

    let shutdown = poller.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.send(()).ok();
        }
    });

    let result = poller.run().await;
    drop(poller);
    reporter.await.ok();

    match result {
        Ok(_) => {
            info!("Poller shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Poller failed with error: {}", e);
            Err(anyhow::anyhow!("Poller error: {}", e))
        }
    }
}
