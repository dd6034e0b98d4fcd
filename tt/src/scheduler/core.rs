//! TickScheduler - periodic sweep trigger
//!
//! A background task that sends a Tick command into the store's channel on
//! a fixed interval and exits cleanly on the shutdown signal. It performs
//! no timer work itself; the sweep runs on the registry actor.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::store::StoreCommand;

use super::TickConfig;

/// Spawns the periodic deadline sweep task
pub struct TickScheduler;

impl TickScheduler {
    /// Spawn the tick task against a store's command channel
    ///
    /// The task stops when the shutdown signal flips to `true` or when the
    /// store's channel closes, whichever comes first.
    pub fn spawn(
        tx: mpsc::Sender<StoreCommand>,
        config: TickConfig,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        info!(interval_ms = config.tick_interval_ms, "TickScheduler starting");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.tick_interval());
            // A machine waking from sleep should reconcile once, not replay
            // every tick it missed.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if tx.send(StoreCommand::Tick).await.is_err() {
                            debug!("TickScheduler: store channel closed, exiting");
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("TickScheduler: shutdown signal received");
                            break;
                        }
                    }
                }
            }

            debug!("TickScheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ticks_flow_into_channel() {
        let (tx, mut rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let config = TickConfig { tick_interval_ms: 10 };
        TickScheduler::spawn(tx, config, shutdown_rx);

        let cmd = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("tick should arrive")
            .expect("channel open");
        assert!(matches!(cmd, StoreCommand::Tick));
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let (tx, mut rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let config = TickConfig { tick_interval_ms: 10 };
        let handle = TickScheduler::spawn(tx, config, shutdown_rx);

        shutdown_tx.send(true).expect("receiver alive");
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should exit")
            .expect("task should not panic");

        // Channel drains and closes once the scheduler is gone
        while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {}
    }

    #[tokio::test]
    async fn test_closed_store_channel_stops_task() {
        let (tx, rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(rx);

        let config = TickConfig { tick_interval_ms: 10 };
        let handle = TickScheduler::spawn(tx, config, shutdown_rx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should exit")
            .expect("task should not panic");
    }
}
