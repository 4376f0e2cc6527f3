// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake broker and queue for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Broker, QueueAddress, QueueError, QueueWriter, QueueWriterFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A message as it landed on a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub queue: String,
    pub group: Option<String>,
    pub body: String,
}

/// Recorded broker call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Connect,
    Open { queue: String },
    Publish { queue: String },
    CloseSender { queue: String },
    Disconnect,
}

#[derive(Default)]
struct FakeBrokerState {
    calls: Vec<BrokerCall>,
    published: Vec<QueuedMessage>,
    live_connection: Option<u64>,
    next_connection: u64,
    connect_failures: u32,
    open_failures: u32,
    publish_failures: u32,
}

/// In-memory broker with injectable outages
#[derive(Clone, Default)]
pub struct FakeBroker {
    inner: Arc<Mutex<FakeBrokerState>>,
}

#[derive(Debug)]
pub struct FakeConnection {
    id: u64,
}

#[derive(Debug)]
pub struct FakeSender {
    connection: u64,
    queue: String,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        self.inner.lock().calls.clone()
    }

    pub fn published(&self) -> Vec<QueuedMessage> {
        self.inner.lock().published.clone()
    }

    /// Number of successful connects so far.
    pub fn connects(&self) -> u64 {
        self.inner.lock().next_connection
    }

    /// Fail the next `n` connect attempts.
    pub fn fail_connects(&self, n: u32) {
        self.inner.lock().connect_failures = n;
    }

    /// Fail the next `n` sender opens.
    pub fn fail_opens(&self, n: u32) {
        self.inner.lock().open_failures = n;
    }

    /// Fail the next `n` publishes.
    pub fn fail_publishes(&self, n: u32) {
        self.inner.lock().publish_failures = n;
    }

    /// Drop the live connection, as a broker restart would.
    pub fn drop_connection(&self) {
        self.inner.lock().live_connection = None;
    }
}

fn take(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl Broker for FakeBroker {
    type Connection = FakeConnection;
    type Sender = FakeSender;

    async fn connect(&self) -> Result<FakeConnection, QueueError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Connect);
        if take(&mut inner.connect_failures) {
            return Err(QueueError::Connect("connection refused".to_string()));
        }
        inner.next_connection += 1;
        let id = inner.next_connection;
        inner.live_connection = Some(id);
        Ok(FakeConnection { id })
    }

    fn is_connected(&self, connection: &FakeConnection) -> bool {
        self.inner.lock().live_connection == Some(connection.id)
    }

    async fn open(&self, connection: &FakeConnection, queue: &str) -> Result<FakeSender, QueueError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Open {
            queue: queue.to_string(),
        });
        if take(&mut inner.open_failures) || inner.live_connection != Some(connection.id) {
            return Err(QueueError::Open {
                queue: queue.to_string(),
                reason: "connection closed".to_string(),
            });
        }
        Ok(FakeSender {
            connection: connection.id,
            queue: queue.to_string(),
        })
    }

    async fn publish(
        &self,
        sender: &FakeSender,
        address: &QueueAddress,
        body: &[u8],
    ) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Publish {
            queue: sender.queue.clone(),
        });
        if take(&mut inner.publish_failures) || inner.live_connection != Some(sender.connection) {
            return Err(QueueError::Publish {
                queue: address.to_string(),
                reason: "link detached".to_string(),
            });
        }
        inner.published.push(QueuedMessage {
            queue: address.queue.clone(),
            group: address.group.clone(),
            body: String::from_utf8_lossy(body).into_owned(),
        });
        Ok(())
    }

    async fn close_sender(&self, sender: FakeSender) -> Result<(), QueueError> {
        self.inner
            .lock()
            .calls
            .push(BrokerCall::CloseSender { queue: sender.queue });
        Ok(())
    }

    async fn disconnect(&self, connection: &FakeConnection) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Disconnect);
        if inner.live_connection == Some(connection.id) {
            inner.live_connection = None;
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeQueueState {
    messages: Vec<QueuedMessage>,
    write_failures: u32,
    closed: bool,
}

/// Writer factory that records messages by logical queue name
#[derive(Clone, Default)]
pub struct FakeQueue {
    inner: Arc<Mutex<FakeQueueState>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message written, in order.
    pub fn messages(&self) -> Vec<QueuedMessage> {
        self.inner.lock().messages.clone()
    }

    /// Bodies written to one logical queue, in order.
    pub fn bodies(&self, queue: &str) -> Vec<String> {
        self.inner
            .lock()
            .messages
            .iter()
            .filter(|m| m.queue == queue)
            .map(|m| m.body.clone())
            .collect()
    }

    /// Fail the next `n` writes.
    pub fn fail_next(&self, n: u32) {
        self.inner.lock().write_failures = n;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

pub struct FakeQueueWriter {
    queue: String,
    inner: Arc<Mutex<FakeQueueState>>,
}

#[async_trait]
impl QueueWriterFactory for FakeQueue {
    type Writer = FakeQueueWriter;

    async fn writer(&self, queue: &str) -> Result<FakeQueueWriter, QueueError> {
        if self.inner.lock().closed {
            return Err(QueueError::Connect("queue closed".to_string()));
        }
        Ok(FakeQueueWriter {
            queue: queue.to_string(),
            inner: Arc::clone(&self.inner),
        })
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.inner.lock().closed = true;
        Ok(())
    }
}

#[async_trait]
impl QueueWriter for FakeQueueWriter {
    async fn write(&self, message: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if take(&mut inner.write_failures) {
            return Err(QueueError::Publish {
                queue: self.queue.clone(),
                reason: "injected failure".to_string(),
            });
        }
        inner.messages.push(QueuedMessage {
            queue: self.queue.clone(),
            group: None,
            body: message.to_string(),
        });
        Ok(())
    }

    async fn close(self) -> Result<(), QueueError> {
        Ok(())
    }
}
