// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::services::test_helpers::Harness;
use crate::substrate::{FakeSubstrate, SubstrateCall, SubstrateOp};
use convoy_core::test_support::{job_spec, stored_event};
use convoy_core::{EventsStore, FakeClock, JobsStore};
use convoy_storage::MemoryStore;

const GRACE: Duration = Duration::from_secs(60);

fn reconciler(h: &Harness) -> DispatchReconciler<MemoryStore, FakeSubstrate, FakeClock> {
    DispatchReconciler::new(&h.deps, GRACE)
}

/// Store an Event created at the harness clock's current time.
async fn event(h: &Harness, id: &str, phase: WorkerPhase, scheduled: bool) {
    let mut event = stored_event(id, "italian", phase);
    event.created = Some(h.clock.now());
    event.worker.scheduled = scheduled;
    h.event(event).await;
}

fn scheduled_tokens(substrate: &FakeSubstrate) -> Vec<(String, Option<String>)> {
    substrate
        .calls_to(SubstrateOp::ScheduleWorker)
        .into_iter()
        .filter_map(|call| match call {
            SubstrateCall::ScheduleWorker { event_id, token } => Some((event_id, token)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn stale_unscheduled_worker_gets_a_fresh_token() {
    let h = Harness::new();
    h.project("italian", "github").await;
    event(&h, "e1", WorkerPhase::Pending, false).await;
    h.clock.advance(GRACE * 2);

    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(
        report,
        ReconcileReport {
            workers: 1,
            jobs: 0,
            failures: 0
        }
    );

    let scheduled = scheduled_tokens(&h.substrate);
    assert_eq!(scheduled.len(), 1);
    let token = scheduled[0].1.clone().unwrap();

    let stored = h.stored("e1").await;
    assert!(stored.worker.scheduled);
    assert_ne!(stored.worker.hashed_token, "hash-e1");
    let found = h
        .store
        .get_event_by_hashed_worker_token(&crate::services::hash_worker_token(&token))
        .await
        .unwrap();
    assert_eq!(found.id, "e1");
}

#[tokio::test]
async fn recent_or_scheduled_workers_are_left_alone() {
    let h = Harness::new();
    h.project("italian", "github").await;
    event(&h, "old-scheduled", WorkerPhase::Pending, true).await;
    event(&h, "old-running", WorkerPhase::Running, false).await;
    h.clock.advance(GRACE * 2);
    event(&h, "fresh", WorkerPhase::Pending, false).await;

    let report = reconciler(&h).reconcile().await.unwrap();

    assert_eq!(report, ReconcileReport::default());
    assert!(h.substrate.calls().is_empty());
    assert_eq!(h.stored("fresh").await.worker.hashed_token, "hash-fresh");
}

#[tokio::test]
async fn terminal_events_are_ignored() {
    let h = Harness::new();
    h.project("italian", "github").await;
    event(&h, "e1", WorkerPhase::Canceled, false).await;
    h.clock.advance(GRACE * 2);

    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report, ReconcileReport::default());
}

#[tokio::test]
async fn stale_unscheduled_jobs_are_rescheduled() {
    let h = Harness::new();
    h.project("italian", "github").await;
    event(&h, "e1", WorkerPhase::Running, true).await;
    h.store
        .create_job("e1", "build", &job_spec("rust"), h.clock.now())
        .await
        .unwrap();
    h.store
        .create_job("e1", "test", &job_spec("rust"), h.clock.now())
        .await
        .unwrap();
    h.store.mark_job_scheduled("e1", "test").await.unwrap();
    h.clock.advance(GRACE * 2);

    let report = reconciler(&h).reconcile().await.unwrap();

    assert_eq!(report.jobs, 1);
    assert_eq!(
        h.substrate.calls(),
        vec![SubstrateCall::ScheduleJob {
            event_id: "e1".to_string(),
            job: "build".to_string(),
        }]
    );
    assert!(h.stored("e1").await.worker.jobs["build"].scheduled);
}

#[tokio::test]
async fn failures_are_counted_and_left_for_the_next_pass() {
    let h = Harness::new();
    h.project("italian", "github").await;
    event(&h, "e1", WorkerPhase::Pending, false).await;
    event(&h, "e2", WorkerPhase::Pending, false).await;
    h.clock.advance(GRACE * 2);
    h.substrate.fail(SubstrateOp::ScheduleWorker, 1);

    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report.workers, 1);
    assert_eq!(report.failures, 1);

    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report.workers, 1);
    assert_eq!(report.failures, 0);
    assert!(h.stored("e1").await.worker.scheduled);
    assert!(h.stored("e2").await.worker.scheduled);
}

#[tokio::test]
async fn missing_project_counts_as_a_failure() {
    let h = Harness::new();
    event(&h, "e1", WorkerPhase::Pending, false).await;
    h.clock.advance(GRACE * 2);

    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report.failures, 1);
    assert!(h.substrate.calls().is_empty());
}

#[tokio::test]
async fn every_page_is_visited() {
    let h = Harness::new();
    h.project("italian", "github").await;
    for i in 0..(PAGE_SIZE + 5) {
        event(&h, &format!("e{i:03}"), WorkerPhase::Pending, false).await;
    }
    h.clock.advance(GRACE * 2);

    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report.workers, PAGE_SIZE + 5);
}

#[tokio::test]
async fn dispatches_still_in_flight_are_skipped() {
    let h = Harness::new();
    h.project("italian", "github").await;
    event(&h, "e1", WorkerPhase::Pending, false).await;
    event(&h, "e2", WorkerPhase::Running, true).await;
    h.store
        .create_job("e2", "build", &job_spec("rust"), h.clock.now())
        .await
        .unwrap();
    h.clock.advance(GRACE * 2);

    let worker = h.deps.inflight.begin(InFlight::worker_key("e1"));
    let job = h.deps.inflight.begin(InFlight::job_key("e2", "build"));
    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report, ReconcileReport::default());
    assert!(h.substrate.calls().is_empty());
    assert_eq!(h.stored("e1").await.worker.hashed_token, "hash-e1");

    drop(worker);
    drop(job);
    let report = reconciler(&h).reconcile().await.unwrap();
    assert_eq!(report.workers, 1);
    assert_eq!(report.jobs, 1);
}
