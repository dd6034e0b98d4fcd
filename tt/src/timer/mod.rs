//! Timer domain type
//!
//! One countdown record per task, tracked via an absolute deadline so no
//! drift accumulates across ticks or process restarts.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Timer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// Counting down toward the deadline
    Active,
    /// Remaining time frozen by the user
    Paused,
    /// Deadline passed; terminal until the timer is removed
    Expired,
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Per-task countdown record
///
/// Serialized camelCase to match the persisted registry format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    /// Task identifier; registry key
    pub task_id: String,

    /// Owner identifier
    pub user_id: String,

    /// Instant the timer was (re)started (epoch ms)
    pub start_time: i64,

    /// Nominal span in seconds, fixed at creation
    pub duration: u64,

    /// Instant the timer expires while active (epoch ms); stale while paused
    pub deadline: i64,

    /// Cached seconds remaining; authoritative only while paused
    pub remaining_time: u64,

    /// Current status
    pub status: TimerStatus,

    /// Instant of the last persisted write (epoch ms); diagnostics only
    #[serde(default)]
    pub last_sync: i64,
}

impl Timer {
    /// Create a new active timer counting down from `duration_secs`
    pub fn new(task_id: impl Into<String>, user_id: impl Into<String>, duration_secs: u64, now_ms: i64) -> Self {
        let task_id = task_id.into();
        debug!(%task_id, duration_secs, "Timer::new: called");
        Self {
            task_id,
            user_id: user_id.into(),
            start_time: now_ms,
            duration: duration_secs,
            deadline: now_ms + duration_secs as i64 * 1000,
            remaining_time: duration_secs,
            status: TimerStatus::Active,
            last_sync: now_ms,
        }
    }

    /// Seconds left at `now_ms`, rounded to the nearest second
    ///
    /// Active timers derive this from the deadline; paused timers report
    /// the frozen value; expired timers always report zero.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        match self.status {
            TimerStatus::Active => round_to_secs(self.deadline - now_ms),
            TimerStatus::Paused => self.remaining_time,
            TimerStatus::Expired => 0,
        }
    }

    /// Whether an active timer has passed its deadline at `now_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.status == TimerStatus::Active && self.deadline <= now_ms
    }

    /// Freeze the remaining time and stop counting down
    pub fn pause_at(&mut self, now_ms: i64) {
        self.remaining_time = self.remaining_at(now_ms);
        self.status = TimerStatus::Paused;
        debug!(task_id = %self.task_id, remaining = self.remaining_time, "Timer::pause_at: frozen");
    }

    /// Resume counting down from the frozen remaining time
    pub fn resume_at(&mut self, now_ms: i64) {
        self.start_time = now_ms;
        self.deadline = now_ms + self.remaining_time as i64 * 1000;
        self.status = TimerStatus::Active;
        debug!(task_id = %self.task_id, deadline = self.deadline, "Timer::resume_at: rescheduled");
    }

    /// Transition to the terminal expired state
    ///
    /// Remaining time is forced to exactly zero, not the last computed
    /// near-zero value.
    pub fn expire(&mut self) {
        self.status = TimerStatus::Expired;
        self.remaining_time = 0;
    }

    /// Whether the timer is counting down
    pub fn is_active(&self) -> bool {
        self.status == TimerStatus::Active
    }

    /// Whether the timer is paused
    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    /// Whether the timer has expired
    pub fn is_expired(&self) -> bool {
        self.status == TimerStatus::Expired
    }
}

/// Round a millisecond delta to whole seconds, clamping negatives to zero
fn round_to_secs(delta_ms: i64) -> u64 {
    if delta_ms <= 0 {
        0
    } else {
        ((delta_ms + 500) / 1000) as u64
    }
}
