//! Concurrency tests for the session store.
//!
//! Many tasks on a multi-threaded runtime hit the same session at once.
//! Each writer replaces a pair of attributes in one `update`; readers
//! must only ever see both halves from the same write.

use std::sync::Arc;

use serde_json::json;
use sessiongate_session::{SessionId, SessionStore};

// ---------------------------------------------------------------------------
// Same session, two execution contexts
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_update_concurrent_writers_readers_never_see_torn_map() {
    let store = Arc::new(SessionStore::new());
    let session = store.create();
    let id = session.id().clone();
    session.update(|attrs| {
        attrs.insert("generation", json!(0)).unwrap();
        attrs.insert("checksum", json!(0)).unwrap();
    });

    let mut tasks = Vec::new();
    for writer in 0..2u64 {
        let store = Arc::clone(&store);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..2_000u64 {
                let generation = writer * 1_000_000 + n;
                let handle = store.get(&id).expect("session stays live");
                handle.update(|attrs| {
                    attrs.insert("generation", json!(generation)).unwrap();
                    attrs.insert("checksum", json!(generation * 3)).unwrap();
                });
                store.touch(&id);
                tokio::task::yield_now().await;
            }
        }));
    }
    for _ in 0..2 {
        let store = Arc::clone(&store);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..2_000 {
                let handle = store.get(&id).expect("session stays live");
                let attrs = handle.attributes();
                let generation = attrs.get("generation").and_then(|v| v.as_u64()).unwrap();
                let checksum = attrs.get("checksum").and_then(|v| v.as_u64()).unwrap();
                assert_eq!(checksum, generation * 3, "torn attribute map");
                tokio::task::yield_now().await;
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_and_remove_concurrently_leaves_consistent_store() {
    let store = Arc::new(SessionStore::new());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let mut kept: Vec<SessionId> = Vec::new();
            for n in 0..200 {
                let session = store.create();
                if n % 2 == 0 {
                    assert!(store.remove(session.id()).is_some());
                } else {
                    kept.push(session.id().clone());
                }
                tokio::task::yield_now().await;
            }
            kept
        }));
    }

    let mut kept = Vec::new();
    for task in tasks {
        kept.extend(task.await.unwrap());
    }

    assert_eq!(store.len(), kept.len());
    assert!(kept.iter().all(|id| store.get(id).is_some()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_during_use_does_not_disturb_in_flight_handle() {
    let store = Arc::new(SessionStore::new());
    let session = store.create();
    let id = session.id().clone();

    let remover = {
        let store = Arc::clone(&store);
        let id = id.clone();
        tokio::spawn(async move { store.remove(&id) })
    };

    for n in 0..100 {
        session.set_attribute("n", json!(n)).unwrap();
    }
    remover.await.unwrap();

    assert_eq!(session.attribute("n"), Some(json!(99)));
    assert!(store.get(&id).is_none());
}
