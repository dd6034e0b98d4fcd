//! Registry - the in-memory timer map and its persistence
//!
//! All mutation, persistence, and reconciliation logic lives here and runs
//! synchronously on the actor task that owns the registry.

use std::collections::HashMap;
use std::sync::Arc;

use kvstore::Storage;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::timer::Timer;

use super::messages::{StoreError, StoreResponse};

/// Owns all timers for the current process
pub(crate) struct Registry {
    timers: HashMap<String, Timer>,
    storage: Box<dyn Storage>,
    clock: Arc<dyn Clock>,
    storage_key: String,
}

impl Registry {
    /// Create an empty registry over the given storage and clock
    pub fn new(storage: Box<dyn Storage>, clock: Arc<dyn Clock>, storage_key: impl Into<String>) -> Self {
        Self {
            timers: HashMap::new(),
            storage,
            clock,
            storage_key: storage_key.into(),
        }
    }

    /// Create and persist a new active timer
    ///
    /// One timer per task: if a non-expired timer already exists for
    /// `task_id`, the call is rejected and the existing timer is returned
    /// unchanged. An expired leftover is replaced. The `created` flag in
    /// the result distinguishes the two outcomes.
    pub fn start(&mut self, task_id: &str, user_id: &str, duration_secs: u64) -> StoreResponse<(Timer, bool)> {
        if duration_secs == 0 {
            return Err(StoreError::InvalidDuration(duration_secs));
        }

        if let Some(existing) = self.timers.get(task_id) {
            if !existing.is_expired() {
                info!(%task_id, status = %existing.status, "start: timer already exists, returning it unchanged");
                return Ok((existing.clone(), false));
            }
        }

        let timer = Timer::new(task_id, user_id, duration_secs, self.clock.now_ms());
        debug!(%task_id, %user_id, duration_secs, deadline = timer.deadline, "start: timer created");
        self.timers.insert(task_id.to_string(), timer.clone());
        self.save()?;
        Ok((timer, true))
    }

    /// Snapshot a timer by task id
    pub fn get(&self, task_id: &str) -> Option<Timer> {
        self.timers.get(task_id).cloned()
    }

    /// Seconds remaining for a task; 0 for unknown or expired tasks
    pub fn remaining(&self, task_id: &str) -> u64 {
        let now = self.clock.now_ms();
        self.timers.get(task_id).map(|t| t.remaining_at(now)).unwrap_or(0)
    }

    /// Freeze an active timer; no-op for unknown or non-active timers
    pub fn pause(&mut self, task_id: &str) -> StoreResponse<()> {
        let now = self.clock.now_ms();
        match self.timers.get_mut(task_id) {
            Some(timer) if timer.is_active() => {
                timer.pause_at(now);
                self.save()
            }
            _ => {
                debug!(%task_id, "pause: no active timer, ignoring");
                Ok(())
            }
        }
    }

    /// Restart a paused timer; no-op for unknown or non-paused timers
    pub fn resume(&mut self, task_id: &str) -> StoreResponse<()> {
        let now = self.clock.now_ms();
        match self.timers.get_mut(task_id) {
            Some(timer) if timer.is_paused() => {
                timer.resume_at(now);
                self.save()
            }
            _ => {
                debug!(%task_id, "resume: no paused timer, ignoring");
                Ok(())
            }
        }
    }

    /// Remove a timer regardless of its status and persist the removal
    ///
    /// Returns whether an entry was actually removed. Eligibility rules
    /// (rejecting expired tasks, duplicates) belong to the server; this
    /// only manages local state.
    pub fn complete(&mut self, task_id: &str) -> StoreResponse<bool> {
        match self.timers.remove(task_id) {
            Some(timer) => {
                debug!(%task_id, status = %timer.status, "complete: timer removed");
                self.save()?;
                Ok(true)
            }
            None => {
                debug!(%task_id, "complete: no timer to remove");
                Ok(false)
            }
        }
    }

    /// All of a user's active timers, excluding paused and expired entries
    pub fn active_for_user(&self, user_id: &str) -> Vec<Timer> {
        self.timers
            .values()
            .filter(|t| t.user_id == user_id && t.is_active())
            .cloned()
            .collect()
    }

    /// Expire every active timer whose deadline has passed
    ///
    /// Persists once if anything changed; paused and expired timers are
    /// never touched. Returns the task ids that expired on this pass.
    pub fn tick(&mut self) -> StoreResponse<Vec<String>> {
        let now = self.clock.now_ms();
        let mut expired = Vec::new();

        for timer in self.timers.values_mut() {
            if timer.is_expired_at(now) {
                timer.expire();
                expired.push(timer.task_id.clone());
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "tick: timers expired");
            self.save()?;
        }

        Ok(expired)
    }

    /// Serialize the full registry to storage under the single key
    pub fn save(&mut self) -> StoreResponse<()> {
        let now = self.clock.now_ms();
        for timer in self.timers.values_mut() {
            timer.last_sync = now;
        }

        let records: Vec<&Timer> = self.timers.values().collect();
        let blob = serde_json::to_string(&records).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.storage
            .set(&self.storage_key, &blob)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        debug!(count = self.timers.len(), key = %self.storage_key, "save: registry persisted");
        Ok(())
    }

    /// Replace the in-memory registry with the persisted one
    ///
    /// Each entry is reconciled against the clock: an active timer whose
    /// deadline passed while offline is admitted as expired. Malformed
    /// entries are skipped so partial corruption never blocks startup.
    /// Returns the number of admitted entries.
    pub fn load(&mut self) -> StoreResponse<usize> {
        let now = self.clock.now_ms();
        let blob = self
            .storage
            .get(&self.storage_key)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let Some(blob) = blob else {
            debug!(key = %self.storage_key, "load: no persisted registry");
            self.timers.clear();
            return Ok(0);
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "load: persisted registry is malformed, starting empty");
                self.timers.clear();
                return Ok(0);
            }
        };

        let mut timers = HashMap::new();
        for entry in entries {
            match serde_json::from_value::<Timer>(entry) {
                Ok(mut timer) => {
                    if timer.is_expired_at(now) {
                        debug!(task_id = %timer.task_id, "load: deadline passed while offline, expiring");
                        timer.expire();
                    }
                    timers.insert(timer.task_id.clone(), timer);
                }
                Err(e) => {
                    warn!(error = %e, "load: skipping malformed timer entry");
                }
            }
        }

        let count = timers.len();
        self.timers = timers;
        info!(count, "load: registry loaded");
        Ok(count)
    }
}
