//! Integration tests for the idle-session sweeper.
//!
//! Every async test runs on a paused clock (`start_paused = true`). The
//! runtime auto-advances to the next timer whenever all tasks are idle, so
//! `tokio::time::sleep` in a test lets the sweeper's interval fire exactly
//! as it would in real time, only instantly.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sessiongate_session::SessionStore;
use sessiongate_sweep::{ExpirySweeper, SweepConfig};

// =========================================================================
// Helpers
// =========================================================================

fn config(interval_ms: u64, idle_ms: u64) -> SweepConfig {
    SweepConfig {
        interval: Duration::from_millis(interval_ms),
        idle_timeout: Duration::from_millis(idle_ms),
    }
}

// =========================================================================
// sweep_once
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sweep_once_empty_store_evicts_nothing() {
    let store = Arc::new(SessionStore::new());
    let sweeper = ExpirySweeper::new(store, config(100, 100));

    assert!(sweeper.sweep_once().is_empty());
    assert_eq!(sweeper.metrics().total_sweeps, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_once_evicts_only_sessions_past_threshold() {
    let store = Arc::new(SessionStore::new());
    let stale = store.create();
    tokio::time::advance(Duration::from_millis(150)).await;
    let fresh = store.create();

    let sweeper = ExpirySweeper::new(Arc::clone(&store), config(1_000, 100));
    let evicted = sweeper.sweep_once();

    assert_eq!(evicted, vec![stale.id().clone()]);
    assert!(store.get(stale.id()).is_none());
    assert!(store.get(fresh.id()).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_once_idle_equal_to_threshold_survives() {
    let store = Arc::new(SessionStore::new());
    let session = store.create();
    tokio::time::advance(Duration::from_millis(100)).await;

    let sweeper = ExpirySweeper::new(Arc::clone(&store), config(1_000, 100));

    assert!(sweeper.sweep_once().is_empty());
    assert!(store.get(session.id()).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_once_updates_metrics() {
    let store = Arc::new(SessionStore::new());
    store.create();
    store.create();
    tokio::time::advance(Duration::from_millis(200)).await;

    let sweeper = ExpirySweeper::new(Arc::clone(&store), config(1_000, 100));
    sweeper.sweep_once();
    sweeper.sweep_once();

    let metrics = sweeper.metrics();
    assert_eq!(metrics.total_sweeps, 2);
    assert_eq!(metrics.total_evicted, 2);
    assert_eq!(metrics.last_evicted, 0);
}

// =========================================================================
// spawn: background loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawn_idle_session_gone_after_next_tick() {
    let store = Arc::new(SessionStore::new());
    let session = store.create();
    let handle = ExpirySweeper::new(Arc::clone(&store), config(100, 250)).spawn();

    // Ticks at 0, 100, 200 ms find the session young enough.
    tokio::time::sleep(Duration::from_millis(210)).await;
    assert!(store.get(session.id()).is_some());

    // The tick at 300 ms sees 300 > 250 and evicts it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.get(session.id()).is_none());
    assert_eq!(handle.metrics().total_evicted, 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_spawn_first_sweep_runs_at_startup() {
    let store = Arc::new(SessionStore::new());
    let handle = ExpirySweeper::new(Arc::clone(&store), config(60_000, 60_000)).spawn();

    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(handle.metrics().total_sweeps, 1);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_spawn_touched_session_survives() {
    let store = Arc::new(SessionStore::new());
    let session = store.create();
    session.set_attribute("user", json!("ada")).unwrap();
    let handle = ExpirySweeper::new(Arc::clone(&store), config(50, 120)).spawn();

    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.touch(session.id()), "session evicted while in use");
    }

    assert!(handle.metrics().total_sweeps >= 20);
    assert_eq!(handle.metrics().total_evicted, 0);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_evictions() {
    let store = Arc::new(SessionStore::new());
    let handle = ExpirySweeper::new(Arc::clone(&store), config(100, 100)).spawn();
    tokio::time::sleep(Duration::from_millis(10)).await;

    handle.shutdown().await;

    let session = store.create();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(store.get(session.id()).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_drop_handle_aborts_task() {
    let store = Arc::new(SessionStore::new());
    let handle = ExpirySweeper::new(Arc::clone(&store), config(100, 100)).spawn();
    tokio::time::sleep(Duration::from_millis(10)).await;

    drop(handle);

    let session = store.create();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(store.get(session.id()).is_some());
}
