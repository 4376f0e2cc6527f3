// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable dispatch queues
//!
//! A [`QueueWriterFactory`] hands out one [`QueueWriter`] per named queue.
//! Messages are opaque strings; consumers resolve context by re-reading the
//! store.

mod address;
mod amqp;
mod broker;
mod retry;

pub use address::QueueAddress;
pub use amqp::{AmqpBroker, AmqpSettings};
pub use broker::{Broker, BrokerWriter, BrokerWriterFactory};
pub use retry::RetryPolicy;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BrokerCall, FakeBroker, FakeQueue, FakeQueueWriter, QueuedMessage};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("open queue {queue} failed: {reason}")]
    Open { queue: String, reason: String },
    #[error("publish to {queue} failed: {reason}")]
    Publish { queue: String, reason: String },
    #[error("close failed: {0}")]
    Close(String),
    #[error("{operation} gave up after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: String,
    },
}

impl From<QueueError> for convoy_core::Error {
    fn from(err: QueueError) -> Self {
        convoy_core::Error::internal(err.to_string())
    }
}

/// Source of per-queue writers sharing one broker connection
#[async_trait]
pub trait QueueWriterFactory: Clone + Send + Sync + 'static {
    type Writer: QueueWriter;

    /// Open a writer for `queue`, reconnecting to the broker if needed.
    async fn writer(&self, queue: &str) -> Result<Self::Writer, QueueError>;

    /// Close the underlying broker connection.
    async fn close(&self) -> Result<(), QueueError>;
}

/// Writer bound to a single queue
#[async_trait]
pub trait QueueWriter: Send + Sync + Sized + 'static {
    /// Publish one durable message.
    async fn write(&self, message: &str) -> Result<(), QueueError>;

    /// Release the writer's broker resources.
    async fn close(self) -> Result<(), QueueError>;
}
