// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Convoy scheduling engine: substrate, services, and background passes

pub mod cleanup;
mod config;
mod engine;
pub mod inflight;
pub mod reconcile;
pub mod services;
pub mod substrate;
mod watch;

pub use cleanup::{CleanupPool, DeadLetter, DeadReason};
pub use config::{CleanupConfig, EngineConfig};
pub use engine::Engine;
pub use inflight::InFlight;
pub use reconcile::{DispatchReconciler, ReconcileReport};
pub use services::{
    EventsService, JobsService, ProjectsService, SecretsService, ServiceDeps, Store,
    WorkersService,
};
pub use substrate::{ClusterSubstrate, ClusterSubstrateConfig, Substrate};
pub use watch::StatusStream;

#[cfg(any(test, feature = "test-support"))]
pub use substrate::{FakeSubstrate, SubstrateCall, SubstrateOp};
