//! Background data refresh system
//!
//! Runs quake fetches on a background task and forwards every delivery to the
//! UI over a tokio channel. A fetch runs at startup, on each interval tick,
//! and whenever the UI requests one.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

use crate::data::Quake;
use crate::fetcher::{Delivery, QuakeFetcher};

/// Default auto-refresh period in seconds
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Where a batch of quakes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Today's cached result
    Cache,
    /// A completed feed request
    Network,
}

/// Messages sent from background refresh to main app
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// A refresh cycle started
    RefreshStarted,
    /// Quakes were delivered
    QuakesLoaded {
        quakes: Vec<Quake>,
        source: DataSource,
    },
    /// The network fetch failed
    RefreshError(String),
    /// The refresh cycle finished
    RefreshCompleted,
}

/// Configuration for refresh intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Interval between automatic refreshes
    pub interval: Duration,
    /// Whether auto-refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh system
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Manual refresh requests
    request_tx: mpsc::Sender<()>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the refresh task; the first fetch starts immediately
    ///
    /// # Arguments
    /// * `fetcher` - Fetcher shared with the task
    /// * `config` - Configuration for automatic refresh
    pub fn spawn(fetcher: QuakeFetcher, config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (request_tx, mut request_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if run_cycle(&fetcher, &msg_tx).await.is_err() {
                return;
            }

            let mut interval = refresh_interval(config.interval);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick(), if config.enabled => {
                        debug!("scheduled quake refresh");
                    }
                    Some(()) = request_rx.recv() => {
                        debug!("manual quake refresh");
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }

                if run_cycle(&fetcher, &msg_tx).await.is_err() {
                    break;
                }
            }
        });

        Self {
            receiver: msg_rx,
            request_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate refresh
    ///
    /// Requests made while one is already queued are merged.
    pub fn request_refresh(&self) {
        let _ = self.request_tx.try_send(());
    }

    /// Shuts down the background refresh task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Timer for automatic refreshes
///
/// A cycle that overruns the period pushes the next tick back instead of
/// triggering catch-up fetches. Periods under one second are raised to one
/// second, since a zero period panics.
fn refresh_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Runs one fetch and forwards its deliveries
///
/// Fails only when the receiving side has gone away.
async fn run_cycle(
    fetcher: &QuakeFetcher,
    tx: &mpsc::Sender<RefreshMessage>,
) -> Result<(), mpsc::error::SendError<RefreshMessage>> {
    tx.send(RefreshMessage::RefreshStarted).await?;

    let mut deliveries = fetcher.fetch_quakes_default().into_stream();
    while let Some(delivery) = deliveries.next().await {
        let message = match delivery {
            Delivery::Cached(quakes) => RefreshMessage::QuakesLoaded {
                quakes,
                source: DataSource::Cache,
            },
            Delivery::Fresh(Ok(quakes)) => RefreshMessage::QuakesLoaded {
                quakes,
                source: DataSource::Network,
            },
            Delivery::Fresh(Err(e)) => RefreshMessage::RefreshError(e.to_string()),
        };
        tx.send(message).await?;
    }

    tx.send(RefreshMessage::RefreshCompleted).await
}

/// Checks for pending refresh messages without blocking
///
/// # Arguments
/// * `handle` - The RefreshHandle to check
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}
