// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for service tests

use super::ServiceDeps;
use crate::cleanup::CleanupPool;
use crate::config::CleanupConfig;
use crate::inflight::InFlight;
use crate::substrate::FakeSubstrate;
use convoy_core::test_support::provisioned_project;
use convoy_core::{
    Event, EventsStore, FakeClock, Principal, Project, ProjectsStore, Role, SequentialIdGen,
};
use convoy_storage::MemoryStore;
use std::time::Duration;

pub(crate) type TestDeps = ServiceDeps<MemoryStore, FakeSubstrate, FakeClock, SequentialIdGen>;

pub(crate) struct Harness {
    pub store: MemoryStore,
    pub substrate: FakeSubstrate,
    pub clock: FakeClock,
    pub deps: TestDeps,
    pub cleanup: CleanupPool,
}

impl Harness {
    /// Must be created inside a tokio runtime.
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let substrate = FakeSubstrate::new();
        let clock = FakeClock::new();
        let deps = ServiceDeps {
            store: store.clone(),
            substrate: substrate.clone(),
            clock: clock.clone(),
            ids: SequentialIdGen::new("evt"),
            inflight: InFlight::new(),
        };
        let cleanup = CleanupPool::spawn(
            substrate.clone(),
            store.clone(),
            &CleanupConfig {
                workers: 1,
                queue_depth: 16,
                attempts: 2,
                backoff: Duration::from_secs(1),
            },
        );
        Self {
            store,
            substrate,
            clock,
            deps,
            cleanup,
        }
    }

    /// Store a provisioned Project subscribed to `source`.
    pub async fn project(&self, id: &str, source: &str) -> Project {
        let project = provisioned_project(id, source);
        self.store.create_project(&project).await.unwrap();
        project
    }

    pub async fn event(&self, event: Event) -> Event {
        self.store.create_event(&event).await.unwrap();
        event
    }

    pub async fn stored(&self, id: &str) -> Event {
        self.store.get_event(id).await.unwrap()
    }
}

/// Wait out the cleanup pool's retries.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_secs(10)).await;
}

pub(crate) fn user(roles: Vec<Role>) -> Principal {
    Principal::user("tester", roles)
}

pub(crate) fn nobody() -> Principal {
    Principal::user("nobody", Vec::new())
}
