// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::substrate::{FakeSubstrate, SubstrateCall, SubstrateOp};
use convoy_core::test_support::stored_event;
use convoy_core::{EventsStore, WorkerPhase};
use convoy_storage::MemoryStore;
use std::time::Duration;

fn config(workers: usize, queue_depth: usize) -> CleanupConfig {
    CleanupConfig {
        workers,
        queue_depth,
        attempts: 3,
        backoff: Duration::from_secs(1),
    }
}

fn event(id: &str) -> Event {
    stored_event(id, "italian", WorkerPhase::Canceled)
}

fn deletes(substrate: &FakeSubstrate) -> Vec<String> {
    substrate
        .calls_to(SubstrateOp::DeleteWorkerAndJobs)
        .into_iter()
        .filter_map(|call| match call {
            SubstrateCall::DeleteWorkerAndJobs { event_id } => Some(event_id),
            _ => None,
        })
        .collect()
}

/// Let the drain tasks run through every retry.
async fn settle() {
    tokio::time::sleep(Duration::from_secs(30)).await;
}

#[tokio::test(start_paused = true)]
async fn enqueued_events_are_cleaned_up() {
    let substrate = FakeSubstrate::new();
    let pool = CleanupPool::spawn(substrate.clone(), MemoryStore::new(), &config(2, 8));

    pool.enqueue(event("e1"));
    pool.enqueue(event("e2"));
    settle().await;

    let mut cleaned = deletes(&substrate);
    cleaned.sort();
    assert_eq!(cleaned, vec!["e1".to_string(), "e2".to_string()]);
    assert!(pool.dead_letters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let substrate = FakeSubstrate::new();
    substrate.fail(SubstrateOp::DeleteWorkerAndJobs, 2);
    let pool = CleanupPool::spawn(substrate.clone(), MemoryStore::new(), &config(1, 8));

    pool.enqueue(event("e1"));
    settle().await;

    assert_eq!(deletes(&substrate).len(), 3);
    assert!(pool.dead_letters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_cleanups_become_dead_letters() {
    let substrate = FakeSubstrate::new();
    substrate.fail(SubstrateOp::DeleteWorkerAndJobs, 3);
    let pool = CleanupPool::spawn(substrate.clone(), MemoryStore::new(), &config(1, 8));

    pool.enqueue(event("e1"));
    settle().await;

    let dead = pool.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].event.id, "e1");
    assert_eq!(dead[0].reason, DeadReason::Exhausted);

    // the outage is over; reconciling finishes the job
    assert_eq!(pool.reconcile(), 1);
    settle().await;
    assert!(pool.dead_letters().is_empty());
    assert_eq!(deletes(&substrate).len(), 4);
}

#[tokio::test(start_paused = true)]
async fn full_queue_defers_instead_of_blocking() {
    let substrate = FakeSubstrate::new();
    let pool = CleanupPool::spawn(substrate.clone(), MemoryStore::new(), &config(1, 1));

    // no await between enqueues: the drain task cannot pick anything up
    pool.enqueue(event("e1"));
    pool.enqueue(event("e2"));
    pool.enqueue(event("e3"));

    let dead = pool.dead_letters();
    assert_eq!(dead.len(), 2);
    assert!(dead.iter().all(|d| d.reason == DeadReason::QueueFull));

    settle().await;
    assert_eq!(deletes(&substrate), vec!["e1".to_string()]);

    pool.reconcile();
    settle().await;
    pool.reconcile();
    settle().await;
    let mut cleaned = deletes(&substrate);
    cleaned.sort();
    assert_eq!(cleaned, vec!["e1", "e2", "e3"]);
}

#[tokio::test(start_paused = true)]
async fn reconcile_with_nothing_dead_is_a_no_op() {
    let pool = CleanupPool::spawn(FakeSubstrate::new(), MemoryStore::new(), &config(1, 4));
    assert_eq!(pool.reconcile(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_draining() {
    let substrate = FakeSubstrate::new();
    let pool = CleanupPool::spawn(substrate.clone(), MemoryStore::new(), &config(2, 4));
    assert_eq!(pool.shutdown().await, 0);
    settle().await;

    pool.enqueue(event("e1"));
    settle().await;

    assert!(deletes(&substrate).is_empty());
    assert_eq!(pool.dead_letters()[0].reason, DeadReason::Stopped);
}

/// A store holding `ids` as canceled Events that still owe cleanup.
async fn store_owing(ids: &[&str]) -> MemoryStore {
    let store = MemoryStore::new();
    for id in ids {
        store
            .create_event(&stored_event(id, "italian", WorkerPhase::Running))
            .await
            .unwrap();
        store.cancel_event(id, chrono::Utc::now()).await.unwrap();
    }
    store
}

fn owed(store: &MemoryStore) -> Vec<String> {
    store.with_state(|s| s.pending_cleanups.keys().cloned().collect())
}

#[tokio::test(start_paused = true)]
async fn shutdown_dead_letters_queued_cleanups() {
    let substrate = FakeSubstrate::new();
    let store = store_owing(&["e1", "e2"]).await;
    let pool = CleanupPool::spawn(substrate.clone(), store.clone(), &config(1, 8));

    // no await before shutdown: both are still queued
    pool.enqueue(event("e1"));
    pool.enqueue(event("e2"));
    assert_eq!(pool.shutdown().await, 2);
    settle().await;

    assert!(deletes(&substrate).is_empty());
    let dead = pool.dead_letters();
    assert_eq!(dead.len(), 2);
    assert!(dead.iter().all(|d| d.reason == DeadReason::Stopped));
    assert_eq!(owed(&store), vec!["e1", "e2"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_dead_letters_a_cleanup_mid_retry() {
    let substrate = FakeSubstrate::new();
    substrate.fail(SubstrateOp::DeleteWorkerAndJobs, 1);
    let store = store_owing(&["e1"]).await;
    let pool = CleanupPool::spawn(substrate.clone(), store.clone(), &config(1, 8));

    pool.enqueue(event("e1"));
    // first attempt fails, the drain task is now sleeping out the backoff
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(deletes(&substrate).len(), 1);

    assert_eq!(pool.shutdown().await, 1);
    assert_eq!(pool.dead_letters()[0].event.id, "e1");
    assert_eq!(owed(&store), vec!["e1"]);
}

#[tokio::test(start_paused = true)]
async fn finished_cleanups_are_cleared_from_the_store() {
    let substrate = FakeSubstrate::new();
    substrate.fail(SubstrateOp::DeleteWorkerAndJobs, 3);
    let store = store_owing(&["e1", "e2"]).await;
    let pool = CleanupPool::spawn(substrate.clone(), store.clone(), &config(1, 8));

    // e1 exhausts its attempts, e2 goes through
    pool.enqueue(event("e1"));
    pool.enqueue(event("e2"));
    settle().await;

    assert_eq!(owed(&store), vec!["e1"]);
    assert_eq!(pool.dead_letters()[0].event.id, "e1");
}

#[tokio::test(start_paused = true)]
async fn resume_requeues_what_the_store_still_owes() {
    let substrate = FakeSubstrate::new();
    let store = store_owing(&["e1", "e2"]).await;
    let pool = CleanupPool::spawn(substrate.clone(), store.clone(), &config(1, 8));

    assert_eq!(pool.resume(&store).await.unwrap(), 2);
    settle().await;

    let mut cleaned = deletes(&substrate);
    cleaned.sort();
    assert_eq!(cleaned, vec!["e1", "e2"]);
    assert!(owed(&store).is_empty());
    assert_eq!(pool.resume(&store).await.unwrap(), 0);
}
