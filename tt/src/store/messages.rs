//! Timer store messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::timer::Timer;

/// Errors from timer store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duration must be greater than zero, got {0}")]
    InvalidDuration(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from timer store operations
pub type StoreResponse<T> = Result<T, StoreError>;

/// Commands sent to the TimerStore actor
#[derive(Debug)]
pub enum StoreCommand {
    /// Create and persist a new active timer
    Start {
        task_id: String,
        user_id: String,
        duration_secs: u64,
        reply: oneshot::Sender<StoreResponse<Timer>>,
    },
    /// Snapshot a timer by task id
    Get {
        task_id: String,
        reply: oneshot::Sender<StoreResponse<Option<Timer>>>,
    },
    /// Seconds remaining for a task (0 if unknown)
    Remaining {
        task_id: String,
        reply: oneshot::Sender<StoreResponse<u64>>,
    },
    /// Freeze an active timer
    Pause {
        task_id: String,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    /// Restart a paused timer against a fresh deadline
    Resume {
        task_id: String,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    /// Remove a timer regardless of its status
    Complete {
        task_id: String,
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    /// List a user's active timers
    ActiveForUser {
        user_id: String,
        reply: oneshot::Sender<StoreResponse<Vec<Timer>>>,
    },
    /// Flush the registry to storage
    Save {
        reply: oneshot::Sender<StoreResponse<()>>,
    },
    /// Reload the registry from storage, reconciling against the clock
    Load {
        reply: oneshot::Sender<StoreResponse<usize>>,
    },
    /// Scheduler pass: expire active timers past their deadline
    Tick,
    /// Stop the actor
    Shutdown,
}
