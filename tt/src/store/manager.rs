//! TimerStore - actor that owns the timer registry
//!
//! Processes commands via channels for thread-safe access to timer state.
//! The tick scheduler feeds the same channel, so every mutation happens on
//! the actor task.

use std::sync::Arc;

use kvstore::Storage;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::scheduler::{TickConfig, TickScheduler};
use crate::timer::Timer;

use super::messages::{StoreCommand, StoreError, StoreResponse};
use super::registry::Registry;

/// Event broadcast when timer state changes that a UI should react to
///
/// Display layers may subscribe instead of polling for transitions; the
/// read-only accessors remain the source for countdown values.
#[derive(Debug, Clone)]
pub enum TimerEvent {
    /// A new timer was started
    Started { task_id: String },
    /// A timer hit its deadline and expired
    Expired { task_id: String },
    /// A timer was removed by completion
    Removed { task_id: String },
}

/// Handle to send commands to the TimerStore actor
#[derive(Clone)]
pub struct TimerStore {
    tx: mpsc::Sender<StoreCommand>,
    /// Broadcast sender for timer state notifications
    event_tx: broadcast::Sender<TimerEvent>,
    /// Shutdown signal for the tick scheduler
    shutdown_tx: watch::Sender<bool>,
}

impl TimerStore {
    /// Spawn a new TimerStore actor over the given storage and clock
    ///
    /// Loads and reconciles the persisted registry before the actor starts,
    /// then launches the tick scheduler against the actor's channel.
    pub fn spawn(
        storage: Box<dyn Storage>,
        clock: Arc<dyn Clock>,
        storage_key: impl Into<String>,
        tick: TickConfig,
    ) -> eyre::Result<Self> {
        let storage_key = storage_key.into();
        debug!(%storage_key, "spawn: called");

        let mut registry = Registry::new(storage, clock, storage_key);
        let loaded = registry
            .load()
            .map_err(|e| eyre::eyre!("Failed to load persisted timers: {}", e))?;
        info!(loaded, "Reconciled persisted timers against the clock");

        let (tx, rx) = mpsc::channel(256);

        // Broadcast channel for timer state notifications (UI subscribes)
        let (event_tx, _) = broadcast::channel(64);

        // Shutdown signal shared by every clone of the handle
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Spawn the actor task, then the scheduler feeding its channel
        tokio::spawn(actor_loop(registry, rx, event_tx.clone()));
        TickScheduler::spawn(tx.clone(), tick, shutdown_rx);

        info!("TimerStore spawned");

        Ok(Self {
            tx,
            event_tx,
            shutdown_tx,
        })
    }

    /// Spawn a TimerStore with file storage and the system clock per config
    pub fn open(config: &Config) -> eyre::Result<Self> {
        debug!(store_path = %config.storage.store_path.display(), "open: called");
        let storage = kvstore::FileStorage::open(&config.storage.store_path)?;
        Self::spawn(
            Box::new(storage),
            Arc::new(SystemClock),
            config.storage.storage_key.clone(),
            config.scheduler.clone(),
        )
    }

    /// Subscribe to timer state events (for push-based UI updates)
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    /// Start a countdown for a task
    ///
    /// If a non-expired timer already exists for `task_id`, the existing
    /// timer is returned unchanged (one timer per task, mirroring the
    /// server-side invariant).
    pub async fn start_timer(
        &self,
        task_id: impl Into<String>,
        user_id: impl Into<String>,
        duration_secs: u64,
    ) -> StoreResponse<Timer> {
        let task_id = task_id.into();
        let user_id = user_id.into();
        debug!(%task_id, %user_id, duration_secs, "start_timer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Start {
                task_id,
                user_id,
                duration_secs,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Snapshot a timer by task id; `None` if unknown
    pub async fn get_timer(&self, task_id: &str) -> StoreResponse<Option<Timer>> {
        debug!(%task_id, "get_timer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Get {
                task_id: task_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Seconds remaining for a task; 0 if unknown or expired
    ///
    /// Computed live from the deadline while active, frozen while paused.
    pub async fn get_remaining_time(&self, task_id: &str) -> StoreResponse<u64> {
        debug!(%task_id, "get_remaining_time: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Remaining {
                task_id: task_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Freeze an active timer; safe to call on any task id
    pub async fn pause_timer(&self, task_id: &str) -> StoreResponse<()> {
        debug!(%task_id, "pause_timer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Pause {
                task_id: task_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Restart a paused timer against a fresh deadline; safe on any task id
    pub async fn resume_timer(&self, task_id: &str) -> StoreResponse<()> {
        debug!(%task_id, "resume_timer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Resume {
                task_id: task_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Remove a task's timer regardless of status and persist the removal
    ///
    /// Completion eligibility (expired/duplicate rules) is the server's
    /// call; this only clears local client state.
    pub async fn complete_timer(&self, task_id: &str) -> StoreResponse<()> {
        debug!(%task_id, "complete_timer: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Complete {
                task_id: task_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// List a user's active timers (excludes paused and expired)
    pub async fn get_active_timers(&self, user_id: &str) -> StoreResponse<Vec<Timer>> {
        debug!(%user_id, "get_active_timers: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::ActiveForUser {
                user_id: user_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Flush the full registry to storage
    ///
    /// Mutations persist themselves; this is for explicit flushes such as
    /// before unload.
    pub async fn save_to_storage(&self) -> StoreResponse<()> {
        debug!("save_to_storage: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Save { reply: reply_tx })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Replace the in-memory registry with the persisted one, reconciling
    /// each entry against the clock; returns the number admitted
    pub async fn load_from_storage(&self) -> StoreResponse<usize> {
        debug!("load_from_storage: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Load { reply: reply_tx })
            .await
            .map_err(|_| StoreError::ChannelError)?;
        reply_rx.await.map_err(|_| StoreError::ChannelError)?
    }

    /// Stop the tick scheduler and the actor
    ///
    /// Idempotent; does not save. Callers that want the final state
    /// persisted flush with [`save_to_storage`](Self::save_to_storage)
    /// first.
    pub async fn destroy(&self) {
        debug!("destroy: called");
        let _ = self.shutdown_tx.send(true);
        let _ = self.tx.send(StoreCommand::Shutdown).await;
    }
}

/// The actor loop that owns the Registry and processes commands
async fn actor_loop(
    mut registry: Registry,
    mut rx: mpsc::Receiver<StoreCommand>,
    event_tx: broadcast::Sender<TimerEvent>,
) {
    debug!("TimerStore actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Start {
                task_id,
                user_id,
                duration_secs,
                reply,
            } => {
                debug!(%task_id, "actor_loop: Start command");
                let result = registry.start(&task_id, &user_id, duration_secs);
                let result = match result {
                    Ok((timer, created)) => {
                        if created {
                            let _ = event_tx.send(TimerEvent::Started { task_id });
                        }
                        Ok(timer)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }

            StoreCommand::Get { task_id, reply } => {
                debug!(%task_id, "actor_loop: Get command");
                let _ = reply.send(Ok(registry.get(&task_id)));
            }

            StoreCommand::Remaining { task_id, reply } => {
                let _ = reply.send(Ok(registry.remaining(&task_id)));
            }

            StoreCommand::Pause { task_id, reply } => {
                debug!(%task_id, "actor_loop: Pause command");
                let _ = reply.send(registry.pause(&task_id));
            }

            StoreCommand::Resume { task_id, reply } => {
                debug!(%task_id, "actor_loop: Resume command");
                let _ = reply.send(registry.resume(&task_id));
            }

            StoreCommand::Complete { task_id, reply } => {
                debug!(%task_id, "actor_loop: Complete command");
                let result = registry.complete(&task_id);
                let result = match result {
                    Ok(removed) => {
                        if removed {
                            let _ = event_tx.send(TimerEvent::Removed { task_id });
                        }
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }

            StoreCommand::ActiveForUser { user_id, reply } => {
                debug!(%user_id, "actor_loop: ActiveForUser command");
                let _ = reply.send(Ok(registry.active_for_user(&user_id)));
            }

            StoreCommand::Save { reply } => {
                debug!("actor_loop: Save command");
                let _ = reply.send(registry.save());
            }

            StoreCommand::Load { reply } => {
                debug!("actor_loop: Load command");
                let _ = reply.send(registry.load());
            }

            StoreCommand::Tick => match registry.tick() {
                Ok(expired) => {
                    for task_id in expired {
                        let _ = event_tx.send(TimerEvent::Expired { task_id });
                    }
                }
                Err(e) => {
                    warn!(error = %e, "actor_loop: tick failed to persist expirations");
                }
            },

            StoreCommand::Shutdown => {
                info!("TimerStore actor shutting down");
                break;
            }
        }
    }

    debug!("TimerStore actor stopped");
}
