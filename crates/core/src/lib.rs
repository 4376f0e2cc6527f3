// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! convoy-core: domain model for the Convoy event orchestrator

pub mod authx;
pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod job;
pub mod project;
pub mod secret;
pub mod store;
pub mod token;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use authx::{authorize, Principal, PrincipalKind, Role, RoleName};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{Error, ResourceKind, Result, ResultExt};
pub use event::{BulkResult, Event, EventGitConfig, EventsSelector, Labels};
pub use id::{EventId, IdGen, ProjectId, SequentialIdGen, UuidIdGen};
pub use job::{
    ContainerFeatures, Job, JobContainerSpec, JobHost, JobPhase, JobSpec, JobStatus,
};
pub use project::{EventSubscription, KubernetesConfig, Project, ProjectSpec};
pub use secret::{Secret, REDACTED};
pub use store::{
    CleanupsStore, EventsStore, JobsStore, ListOptions, Page, ProjectsStore, WorkersStore,
};
pub use token::{hash_token, new_token};
pub use worker::{
    ContainerSpec, JobPolicies, LogLevel, Worker, WorkerGitConfig, WorkerKubernetesConfig,
    WorkerPhase, WorkerSpec, WorkerStatus,
};
