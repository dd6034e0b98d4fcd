//! Tick scheduler for deadline sweeps
//!
//! Triggers a periodic pass over active timers via the store's command
//! channel, so the sweep itself always executes on the registry actor.

mod config;
mod core;

pub use config::TickConfig;
pub use core::TickScheduler;
