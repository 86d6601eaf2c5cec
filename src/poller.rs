//! Poll-on-interval coordinator
//!
//! Runs [`AlliantClient::fetch`] on a fixed schedule, one cycle at a time,
//! and publishes the latest snapshot and cycle status on watch channels.

use crate::client::AlliantClient;
use crate::error::Result;
use crate::logging::get_logger;
use crate::snapshot::UsageSnapshot;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Outcome of the most recent cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// No cycle has finished yet
    Pending,
    Ok { at: DateTime<Utc> },
    /// Credentials rejected; needs user action
    AuthFailed { message: String },
    /// Transport or other failure; retried next cycle
    Failed { message: String },
}

impl PollStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, PollStatus::Ok { .. })
    }
}

/// Drives periodic fetches for one client
pub struct UsagePoller {
    client: Arc<Mutex<AlliantClient>>,
    interval: Duration,
    latest: watch::Sender<Option<Arc<UsageSnapshot>>>,
    status: watch::Sender<PollStatus>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,
    total_polls: u64,
    failed_polls: u64,
    logger: crate::logging::StructuredLogger,
}

impl UsagePoller {
    pub fn new(client: AlliantClient, interval: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        let (status, _) = watch::channel(PollStatus::Pending);
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(Mutex::new(client)),
            interval,
            latest,
            status,
            shutdown_tx,
            shutdown_rx,
            total_polls: 0,
            failed_polls: 0,
            logger: get_logger("poller"),
        }
    }

    /// Receiver for published snapshots
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<UsageSnapshot>>> {
        self.latest.subscribe()
    }

    /// Receiver for cycle status
    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    /// Latest published snapshot, if any
    pub fn latest(&self) -> Option<Arc<UsageSnapshot>> {
        self.latest.borrow().clone()
    }

    /// Sender that stops [`UsagePoller::run`]
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_tx.send(()).ok();
    }

    /// Shared handle to the underlying client
    pub fn client(&self) -> Arc<Mutex<AlliantClient>> {
        self.client.clone()
    }

    /// Release the client's connection pool
    pub async fn close(&self) {
        self.client.lock().await.close();
    }

    /// (total, failed) cycle counters
    pub fn counters(&self) -> (u64, u64) {
        (self.total_polls, self.failed_polls)
    }

    /// Run one cycle now and publish the result.
    ///
    /// On failure the previous snapshot stays published and only the status
    /// changes.
    pub async fn refresh(&mut self) -> Result<Arc<UsageSnapshot>> {
        self.total_polls = self.total_polls.saturating_add(1);
        let outcome = {
            let mut client = self.client.lock().await;
            client.fetch().await
        };

        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.latest.send_replace(Some(snapshot.clone()));
                self.status.send_replace(PollStatus::Ok {
                    at: snapshot.last_api_update,
                });
                Ok(snapshot)
            }
            Err(e) => {
                self.failed_polls = self.failed_polls.saturating_add(1);
                let message = e.to_string();
                let status = if e.is_auth() {
                    PollStatus::AuthFailed { message }
                } else {
                    PollStatus::Failed { message }
                };
                self.status.send_replace(status);
                Err(e)
            }
        }
    }

    /// Poll until shutdown is requested, then release the connection pool
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info(&format!(
            "Polling every {} seconds",
            self.interval.as_secs()
        ));
        let mut poll_interval = interval(self.interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = self.refresh().await {
                        self.logger.error(&format!("Poll cycle failed: {}", e));
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.close().await;
        let (total, failed) = self.counters();
        self.logger.info(&format!(
            "Poller stopped after {} cycles ({} failed)",
            total, failed
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn poller() -> UsagePoller {
        let mut config = Config::default();
        config.account.username = "user@example.com".into();
        config.account.password = "secret".into();
        // Nothing listens here; a cycle that runs fails fast
        config.api.base_url = "http://127.0.0.1:9".into();
        config.api.timeout_seconds = 2;
        let client = AlliantClient::new(&config, None).unwrap();
        UsagePoller::new(client, Duration::from_secs(3600))
    }

    #[test]
    fn starts_pending_with_nothing_published() {
        let poller = poller();
        assert_eq!(*poller.status().borrow(), PollStatus::Pending);
        assert!(poller.latest().is_none());
        assert_eq!(poller.counters(), (0, 0));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_request() {
        let mut poller = poller();
        poller.request_shutdown();
        let result = tokio::time::timeout(Duration::from_secs(30), poller.run()).await;
        assert!(matches!(result, Ok(Ok(()))));
        let (total, failed) = poller.counters();
        assert_eq!(total, failed);
    }
}
