//! TaskTimer - per-task countdown timer engine
//!
//! Tracks many independent per-task countdown deadlines on a client that
//! may sleep, reload, or run offline, while keeping displayed remaining
//! time accurate, supporting pause/resume, and surviving process restarts
//! without drift or data loss.
//!
//! # Core Concepts
//!
//! - **Absolute Deadlines**: time is tracked via deadline timestamps, never
//!   decrementing counters, so no drift accumulates across ticks or restarts
//! - **Single-Writer Registry**: one actor task owns the timer map; the
//!   public API and the tick scheduler both go through its command channel
//! - **Reconciliation**: persisted timers are re-evaluated against the
//!   clock on load, so a deadline that passed while offline expires cleanly
//! - **Injected Time and Storage**: the [`clock::Clock`] and
//!   [`kvstore::Storage`] seams keep the engine deterministic under test
//!
//! # Modules
//!
//! - [`clock`] - time source abstraction
//! - [`timer`] - timer record and its state machine
//! - [`store`] - registry actor and the public [`store::TimerStore`] handle
//! - [`scheduler`] - periodic deadline sweep
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod clock;
pub mod config;
pub mod scheduler;
pub mod store;
pub mod timer;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, StorageConfig};
pub use scheduler::{TickConfig, TickScheduler};
pub use store::{StoreCommand, StoreError, StoreResponse, TimerEvent, TimerStore};
pub use timer::{Timer, TimerStatus};
