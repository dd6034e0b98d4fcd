//! Integration tests for the task timer engine
//!
//! These tests verify end-to-end behavior of the store actor, the tick
//! scheduler, and persistence. Time is driven by a ManualClock so nothing
//! here depends on real wall-clock sleeps for correctness.

use std::sync::Arc;
use std::time::Duration;

use kvstore::{FileStorage, MemoryStorage, Storage};
use tasktimer::{ManualClock, StoreError, TickConfig, TimerEvent, TimerStatus, TimerStore};
use tempfile::TempDir;

const T0: i64 = 1_700_000_000_000;
const KEY: &str = "task_timers";

fn spawn_store(clock: Arc<ManualClock>) -> TimerStore {
    TimerStore::spawn(Box::new(MemoryStorage::new()), clock, KEY, TickConfig::default()).expect("Failed to spawn store")
}

/// Spawn a store whose scheduler ticks fast enough for tests to observe
fn spawn_store_with_fast_ticks(clock: Arc<ManualClock>) -> TimerStore {
    TimerStore::spawn(
        Box::new(MemoryStorage::new()),
        clock,
        KEY,
        TickConfig { tick_interval_ms: 20 },
    )
    .expect("Failed to spawn store")
}

async fn wait_for_expired(store: &TimerStore, task_id: &str) {
    for _ in 0..100 {
        if let Some(timer) = store.get_timer(task_id).await.expect("store alive") {
            if timer.status == TimerStatus::Expired {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timer {task_id} never expired");
}

// =============================================================================
// Countdown Tests
// =============================================================================

#[tokio::test]
async fn test_start_gives_full_duration() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    let timer = store.start_timer("t1", "u1", 5).await.expect("start");
    assert_eq!(timer.status, TimerStatus::Active);

    let first = store.get_remaining_time("t1").await.expect("remaining");
    assert!(first > 0 && first <= 5, "remaining {first} out of range");

    clock.advance_secs(2);
    let second = store.get_remaining_time("t1").await.expect("remaining");
    assert_eq!(second, 3);
    assert!(second < first);

    store.destroy().await;
}

#[tokio::test]
async fn test_remaining_is_non_increasing_while_active() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("t1", "u1", 30).await.expect("start");

    let mut last = u64::MAX;
    for _ in 0..6 {
        let remaining = store.get_remaining_time("t1").await.expect("remaining");
        assert!(remaining <= last, "remaining went up: {remaining} > {last}");
        last = remaining;
        clock.advance_ms(4_700);
    }

    store.destroy().await;
}

#[tokio::test]
async fn test_independent_deadlines_per_task() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("short", "u1", 1800).await.expect("start");
    clock.advance_secs(60);
    store.start_timer("long", "u1", 7200).await.expect("start");

    assert_eq!(store.get_remaining_time("short").await.expect("remaining"), 1740);
    assert_eq!(store.get_remaining_time("long").await.expect("remaining"), 7200);

    store.destroy().await;
}

// =============================================================================
// Pause / Resume Tests
// =============================================================================

#[tokio::test]
async fn test_pause_freezes_resume_continues() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("t1", "u1", 10).await.expect("start");
    clock.advance_secs(1);

    store.pause_timer("t1").await.expect("pause");
    assert_eq!(store.get_remaining_time("t1").await.expect("remaining"), 9);

    // Time passes while paused; remaining stays frozen
    clock.advance_secs(2);
    assert_eq!(store.get_remaining_time("t1").await.expect("remaining"), 9);

    // Resume picks up from the frozen value, not the original duration
    store.resume_timer("t1").await.expect("resume");
    clock.advance_secs(2);
    assert_eq!(store.get_remaining_time("t1").await.expect("remaining"), 7);

    store.destroy().await;
}

#[tokio::test]
async fn test_duplicate_ui_events_are_safe() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("t1", "u1", 60).await.expect("start");
    clock.advance_secs(5);

    // Double-dispatched pause clicks
    store.pause_timer("t1").await.expect("pause");
    store.pause_timer("t1").await.expect("pause again");
    assert_eq!(store.get_remaining_time("t1").await.expect("remaining"), 55);

    // Pause/resume on unknown tasks never error
    store.pause_timer("ghost").await.expect("pause unknown");
    store.resume_timer("ghost").await.expect("resume unknown");
    assert_eq!(store.get_remaining_time("ghost").await.expect("remaining"), 0);

    store.destroy().await;
}

// =============================================================================
// Expiry Tests
// =============================================================================

#[tokio::test]
async fn test_tick_expires_overdue_timer() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store_with_fast_ticks(clock.clone());
    let mut events = store.subscribe_events();

    store.start_timer("t1", "u1", 2).await.expect("start");
    clock.advance_ms(2_500);

    wait_for_expired(&store, "t1").await;
    let timer = store.get_timer("t1").await.expect("get").expect("present");
    assert_eq!(timer.status, TimerStatus::Expired);
    assert_eq!(timer.remaining_time, 0);
    assert_eq!(store.get_remaining_time("t1").await.expect("remaining"), 0);

    // Expiry was announced to subscribers
    let mut saw_expired = false;
    while let Ok(event) = events.try_recv() {
        if let TimerEvent::Expired { task_id } = event {
            assert_eq!(task_id, "t1");
            saw_expired = true;
        }
    }
    assert!(saw_expired, "no Expired event broadcast");

    // Terminal: more time and more ticks change nothing
    clock.advance_secs(60);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let timer = store.get_timer("t1").await.expect("get").expect("present");
    assert_eq!(timer.status, TimerStatus::Expired);

    // Expired timers are not resumable, only removable
    store.resume_timer("t1").await.expect("resume is a no-op");
    let timer = store.get_timer("t1").await.expect("get").expect("present");
    assert_eq!(timer.status, TimerStatus::Expired);

    store.destroy().await;
}

#[tokio::test]
async fn test_expiration_does_not_remove_timer() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store_with_fast_ticks(clock.clone());

    store.start_timer("t1", "u1", 1).await.expect("start");
    clock.advance_secs(5);
    wait_for_expired(&store, "t1").await;

    // Still present until completed explicitly
    assert!(store.get_timer("t1").await.expect("get").is_some());
    store.complete_timer("t1").await.expect("complete");
    assert!(store.get_timer("t1").await.expect("get").is_none());

    store.destroy().await;
}

// =============================================================================
// Completion Tests
// =============================================================================

#[tokio::test]
async fn test_complete_removes_any_status() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("active", "u1", 60).await.expect("start");
    store.start_timer("paused", "u1", 60).await.expect("start");
    store.pause_timer("paused").await.expect("pause");

    store.complete_timer("active").await.expect("complete");
    store.complete_timer("paused").await.expect("complete");
    // Unknown task: still a defined no-op
    store.complete_timer("ghost").await.expect("complete unknown");

    assert!(store.get_timer("active").await.expect("get").is_none());
    assert!(store.get_timer("paused").await.expect("get").is_none());

    store.destroy().await;
}

// =============================================================================
// Start Policy Tests
// =============================================================================

#[tokio::test]
async fn test_start_on_running_task_returns_existing() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    let first = store.start_timer("t1", "u1", 60).await.expect("start");
    clock.advance_secs(10);

    let second = store.start_timer("t1", "u1", 600).await.expect("restart");
    assert_eq!(second.deadline, first.deadline);
    assert_eq!(second.duration, 60);
    assert_eq!(store.get_remaining_time("t1").await.expect("remaining"), 50);

    store.destroy().await;
}

#[tokio::test]
async fn test_zero_duration_is_rejected() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock);

    let result = store.start_timer("t1", "u1", 0).await;
    assert!(matches!(result, Err(StoreError::InvalidDuration(0))));
    assert!(store.get_timer("t1").await.expect("get").is_none());

    store.destroy().await;
}

// =============================================================================
// Per-User Listing Tests
// =============================================================================

#[tokio::test]
async fn test_active_timers_scoped_to_user_and_status() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("a", "u1", 3600).await.expect("start");
    store.start_timer("b", "u1", 1800).await.expect("start");
    store.start_timer("c", "u1", 7200).await.expect("start");
    store.start_timer("d", "u2", 3600).await.expect("start");

    let timers = store.get_active_timers("u1").await.expect("list");
    assert_eq!(timers.len(), 3);
    assert!(timers.iter().all(|t| t.user_id == "u1"));

    // Paused timers drop out of the active listing
    store.pause_timer("b").await.expect("pause");
    let timers = store.get_active_timers("u1").await.expect("list");
    assert_eq!(timers.len(), 2);

    let timers = store.get_active_timers("u2").await.expect("list");
    assert_eq!(timers.len(), 1);
    assert!(store.get_active_timers("nobody").await.expect("list").is_empty());

    store.destroy().await;
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[tokio::test]
async fn test_round_trip_through_file_storage() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let clock = Arc::new(ManualClock::new(T0));

    let storage = FileStorage::open(temp.path()).expect("open storage");
    let store = TimerStore::spawn(Box::new(storage), clock.clone(), KEY, TickConfig::default()).expect("spawn");

    store.start_timer("running", "u1", 600).await.expect("start");
    store.start_timer("frozen", "u1", 600).await.expect("start");
    clock.advance_secs(60);
    store.pause_timer("frozen").await.expect("pause");

    store.save_to_storage().await.expect("flush");
    store.destroy().await;

    // A fresh store instance over the same path reconstructs the registry
    let storage = FileStorage::open(temp.path()).expect("reopen storage");
    let store = TimerStore::spawn(Box::new(storage), clock.clone(), KEY, TickConfig::default()).expect("respawn");

    let running = store.get_timer("running").await.expect("get").expect("present");
    assert_eq!(running.status, TimerStatus::Active);
    assert_eq!(store.get_remaining_time("running").await.expect("remaining"), 540);

    let frozen = store.get_timer("frozen").await.expect("get").expect("present");
    assert_eq!(frozen.status, TimerStatus::Paused);
    assert_eq!(store.get_remaining_time("frozen").await.expect("remaining"), 540);

    store.destroy().await;
}

#[tokio::test]
async fn test_offline_recovery_expires_overdue_entry() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut storage = MemoryStorage::new();

    // Persisted by some earlier run; deadline an hour in the past
    let blob = serde_json::json!([{
        "taskId": "stale",
        "userId": "u1",
        "startTime": T0 - 7_200_000,
        "duration": 3600,
        "deadline": T0 - 3_600_000,
        "remainingTime": 1200,
        "status": "active",
        "lastSync": T0 - 4_000_000,
    }]);
    storage.set(KEY, &blob.to_string()).expect("seed storage");

    let store = TimerStore::spawn(Box::new(storage), clock, KEY, TickConfig::default()).expect("spawn");

    let timer = store.get_timer("stale").await.expect("get").expect("present");
    assert_eq!(timer.status, TimerStatus::Expired);
    assert_eq!(timer.remaining_time, 0);
    assert_eq!(store.get_remaining_time("stale").await.expect("remaining"), 0);

    store.destroy().await;
}

#[tokio::test]
async fn test_corrupt_entries_do_not_block_startup() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut storage = MemoryStorage::new();

    let blob = format!(
        r#"[{{"taskId":"good","userId":"u1","startTime":{T0},"duration":120,"deadline":{deadline},"remainingTime":120,"status":"active","lastSync":{T0}}},{{"status":"active"}},"noise"]"#,
        deadline = T0 + 120_000,
    );
    storage.set(KEY, &blob).expect("seed storage");

    let store = TimerStore::spawn(Box::new(storage), clock, KEY, TickConfig::default()).expect("spawn");

    assert!(store.get_timer("good").await.expect("get").is_some());
    assert_eq!(store.get_remaining_time("good").await.expect("remaining"), 120);

    store.destroy().await;
}

#[tokio::test]
async fn test_explicit_reload_replaces_registry() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock.clone());

    store.start_timer("t1", "u1", 60).await.expect("start");
    let loaded = store.load_from_storage().await.expect("reload");
    assert_eq!(loaded, 1);
    assert!(store.get_timer("t1").await.expect("get").is_some());

    store.destroy().await;
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_destroy_is_idempotent_and_stops_the_actor() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock);

    store.start_timer("t1", "u1", 60).await.expect("start");

    store.destroy().await;
    store.destroy().await;

    // The actor is gone; calls now fail with a channel error, not a hang
    let result = tokio::time::timeout(Duration::from_secs(1), store.get_timer("t1"))
        .await
        .expect("should not hang");
    assert!(matches!(result, Err(StoreError::ChannelError)));
}

#[tokio::test]
async fn test_started_event_broadcast() {
    let clock = Arc::new(ManualClock::new(T0));
    let store = spawn_store(clock);
    let mut events = store.subscribe_events();

    store.start_timer("t1", "u1", 60).await.expect("start");
    // Rejected duplicate start does not announce a second timer
    store.start_timer("t1", "u1", 60).await.expect("restart");

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("event should arrive")
        .expect("channel open");
    assert!(matches!(event, TimerEvent::Started { task_id } if task_id == "t1"));
    assert!(events.try_recv().is_err(), "duplicate start should not broadcast");

    store.destroy().await;
}
