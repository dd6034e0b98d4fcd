//! Tick scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the tick scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Milliseconds between sweep passes
    #[serde(rename = "tick-interval-ms")]
    pub tick_interval_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 1000 }
    }
}

impl TickConfig {
    /// Get the tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
