// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::services::test_helpers::{nobody, user, Harness};
use crate::substrate::{FakeSubstrate, SubstrateCall, SubstrateOp};
use convoy_core::test_support::stored_event;
use convoy_core::{Clock, EventsStore};
use convoy_storage::MemoryStore;
use tokio_stream::StreamExt;

const WATCH: Duration = Duration::from_secs(2);

fn service(h: &Harness) -> WorkersService<MemoryStore, FakeSubstrate> {
    WorkersService::new(&h.deps, WATCH)
}

fn status(phase: WorkerPhase) -> WorkerStatus {
    WorkerStatus {
        phase,
        ..Default::default()
    }
}

#[tokio::test]
async fn start_pending_worker() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Pending)).await;

    service(&h).start(&Principal::scheduler(), "e1").await.unwrap();

    assert_eq!(
        h.substrate.calls(),
        vec![SubstrateCall::StartWorker {
            event_id: "e1".to_string()
        }]
    );
}

#[tokio::test]
async fn start_rejects_started_workers() {
    for phase in [WorkerPhase::Running, WorkerPhase::Succeeded, WorkerPhase::Canceled] {
        let h = Harness::new();
        h.event(stored_event("e1", "italian", phase)).await;

        let err = service(&h)
            .start(&Principal::scheduler(), "e1")
            .await
            .unwrap_err();

        assert!(err.is_conflict(), "{phase}");
        assert!(h.substrate.calls().is_empty());
    }
}

#[tokio::test]
async fn start_requires_scheduler() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Pending)).await;
    let err = service(&h)
        .start(&Principal::observer(), "e1")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn start_surfaces_substrate_failures() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Pending)).await;
    h.substrate.fail(SubstrateOp::StartWorker, 1);

    let err = service(&h)
        .start(&Principal::scheduler(), "e1")
        .await
        .unwrap_err();
    assert!(matches!(err.root(), Error::Internal(_)));
}

#[tokio::test]
async fn get_status_reads_the_stored_phase() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Running)).await;
    let svc = service(&h);

    let got = svc
        .get_status(&user(vec![Role::reader()]), "e1")
        .await
        .unwrap();
    assert_eq!(got.phase, WorkerPhase::Running);
    assert!(svc.get_status(&nobody(), "e1").await.unwrap_err().is_unauthorized());
    assert!(svc
        .get_status(&Principal::root(), "e2")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test(start_paused = true)]
async fn watch_emits_each_interval_and_sees_updates() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Pending)).await;
    let svc = service(&h);

    let mut stream = svc.watch_status(&Principal::root(), "e1").await.unwrap();
    assert_eq!(stream.next().await.unwrap().phase, WorkerPhase::Pending);

    svc.update_status(&Principal::observer(), "e1", status(WorkerPhase::Running))
        .await
        .unwrap();
    assert_eq!(stream.next().await.unwrap().phase, WorkerPhase::Running);
}

#[tokio::test(start_paused = true)]
async fn watch_ends_when_the_event_disappears() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Running)).await;

    let mut stream = service(&h)
        .watch_status(&Principal::root(), "e1")
        .await
        .unwrap();
    assert!(stream.next().await.is_some());

    h.store.delete_event("e1").await.unwrap();
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn watch_of_missing_event_is_not_found() {
    let h = Harness::new();
    let err = service(&h)
        .watch_status(&Principal::root(), "e1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_moves_forward() {
    for (from, to) in [
        (WorkerPhase::Pending, WorkerPhase::Running),
        (WorkerPhase::Pending, WorkerPhase::Failed),
        (WorkerPhase::Running, WorkerPhase::Running),
        (WorkerPhase::Running, WorkerPhase::Succeeded),
    ] {
        let h = Harness::new();
        h.event(stored_event("e1", "italian", from)).await;

        service(&h)
            .update_status(&Principal::observer(), "e1", status(to))
            .await
            .unwrap();
        assert_eq!(h.stored("e1").await.phase(), to);
    }
}

#[tokio::test]
async fn update_rejects_backward_moves() {
    for (from, to) in [
        (WorkerPhase::Running, WorkerPhase::Pending),
        (WorkerPhase::Succeeded, WorkerPhase::Running),
        (WorkerPhase::Canceled, WorkerPhase::Failed),
    ] {
        let h = Harness::new();
        h.event(stored_event("e1", "italian", from)).await;

        let err = service(&h)
            .update_status(&Principal::observer(), "e1", status(to))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "{from} -> {to}");
        assert_eq!(h.stored("e1").await.phase(), from);
    }
}

#[tokio::test]
async fn update_requires_observer() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Pending)).await;
    let err = service(&h)
        .update_status(&Principal::scheduler(), "e1", status(WorkerPhase::Running))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn update_after_cancel_keeps_the_cancellation() {
    let h = Harness::new();
    h.event(stored_event("e1", "italian", WorkerPhase::Running)).await;
    h.store.cancel_event("e1", h.clock.now()).await.unwrap();

    let err = service(&h)
        .update_status(&Principal::observer(), "e1", status(WorkerPhase::Succeeded))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(h.stored("e1").await.phase(), WorkerPhase::Aborted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cancel_and_update_have_exactly_one_winner() {
    for _ in 0..50 {
        let h = Harness::new();
        h.event(stored_event("e1", "italian", WorkerPhase::Running)).await;
        let svc = service(&h);
        let store = h.store.clone();
        let now = h.clock.now();

        let update = tokio::spawn(async move {
            svc.update_status(&Principal::observer(), "e1", status(WorkerPhase::Succeeded))
                .await
        });
        let cancel = tokio::spawn(async move { store.cancel_event("e1", now).await });
        let (update, cancel) = (update.await.unwrap(), cancel.await.unwrap());

        let phase = h.stored("e1").await.phase();
        match (update.is_ok(), cancel.is_ok()) {
            (true, false) => assert_eq!(phase, WorkerPhase::Succeeded),
            (false, true) => assert_eq!(phase, WorkerPhase::Aborted),
            other => panic!("both or neither won: {other:?}"),
        }
    }
}
