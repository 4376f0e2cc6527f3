// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the container cluster and the dispatch queue

pub mod cluster;
mod env;
pub mod queue;
pub mod subprocess;
pub mod traced;

pub use cluster::{ClusterClient, ClusterError, KubectlClient, LabelMap, Object, ObjectKind, ObjectMeta};
pub use queue::{
    AmqpBroker, AmqpSettings, Broker, BrokerWriter, BrokerWriterFactory, QueueAddress, QueueError,
    QueueWriter, QueueWriterFactory, RetryPolicy,
};
pub use traced::{TracedCluster, TracedQueue, TracedQueueWriter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use cluster::{ClusterCall, FakeCluster};
#[cfg(any(test, feature = "test-support"))]
pub use queue::{BrokerCall, FakeBroker, FakeQueue, FakeQueueWriter, QueuedMessage};
