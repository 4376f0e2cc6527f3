// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnecting queue writers over a pluggable message broker

use super::{QueueAddress, QueueError, QueueWriter, QueueWriterFactory, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How long closing a writer may take before it is abandoned.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Low-level broker operations the writer factory builds on
#[async_trait]
pub trait Broker: Clone + Send + Sync + 'static {
    type Connection: Send + Sync + 'static;
    type Sender: Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Connection, QueueError>;

    fn is_connected(&self, connection: &Self::Connection) -> bool;

    /// Open a sender on the physical queue, declaring it durable.
    async fn open(
        &self,
        connection: &Self::Connection,
        queue: &str,
    ) -> Result<Self::Sender, QueueError>;

    /// Publish a persistent message and wait for the broker to accept it.
    async fn publish(
        &self,
        sender: &Self::Sender,
        address: &QueueAddress,
        body: &[u8],
    ) -> Result<(), QueueError>;

    async fn close_sender(&self, sender: Self::Sender) -> Result<(), QueueError>;

    async fn disconnect(&self, connection: &Self::Connection) -> Result<(), QueueError>;
}

/// Writer factory sharing one broker connection
///
/// The connection sits behind an async mutex held across reconnects, so
/// concurrent callers during an outage wait on a single reconnect rather
/// than each dialing the broker.
pub struct BrokerWriterFactory<B: Broker> {
    broker: B,
    retry: RetryPolicy,
    multiplexed: bool,
    connection: Arc<Mutex<Option<Arc<B::Connection>>>>,
}

impl<B: Broker> Clone for BrokerWriterFactory<B> {
    fn clone(&self) -> Self {
        Self {
            broker: self.broker.clone(),
            retry: self.retry,
            multiplexed: self.multiplexed,
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<B: Broker> BrokerWriterFactory<B> {
    /// Connect to the broker, retrying per `retry`.
    pub async fn connect(
        broker: B,
        retry: RetryPolicy,
        multiplexed: bool,
    ) -> Result<Self, QueueError> {
        let factory = Self {
            broker,
            retry,
            multiplexed,
            connection: Arc::new(Mutex::new(None)),
        };
        factory.current_connection(None).await?;
        Ok(factory)
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// The live connection, reconnecting if it dropped or if the caller
    /// found `stale` unusable.
    async fn current_connection(
        &self,
        stale: Option<&Arc<B::Connection>>,
    ) -> Result<Arc<B::Connection>, QueueError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            let known_bad = stale.is_some_and(|s| Arc::ptr_eq(s, conn));
            if !known_bad && self.broker.is_connected(conn) {
                return Ok(Arc::clone(conn));
            }
        }

        if let Some(old) = guard.take() {
            if let Err(e) = self.broker.disconnect(&old).await {
                tracing::debug!(error = %e, "closing stale broker connection failed");
            }
        }

        let broker = &self.broker;
        let conn = Arc::new(self.retry.run("connect", move || broker.connect()).await?);
        tracing::info!("connected to message broker");
        *guard = Some(Arc::clone(&conn));
        Ok(conn)
    }

    /// Open a sender, reconnecting between failed attempts.
    async fn open_sender(&self, address: &QueueAddress) -> Result<B::Sender, QueueError> {
        let mut stale = None;
        let mut last = String::new();
        for attempt in 1..=self.retry.attempts.max(1) {
            let conn = self.current_connection(stale.as_ref()).await?;
            match self.broker.open(&conn, &address.queue).await {
                Ok(sender) => return Ok(sender),
                Err(e) => {
                    tracing::warn!(queue = %address, attempt, error = %e, "open failed, reconnecting");
                    last = e.to_string();
                    stale = Some(conn);
                }
            }
        }
        Err(QueueError::Exhausted {
            operation: format!("open {}", address),
            attempts: self.retry.attempts.max(1),
            last,
        })
    }
}

#[async_trait]
impl<B: Broker> QueueWriterFactory for BrokerWriterFactory<B> {
    type Writer = BrokerWriter<B>;

    async fn writer(&self, queue: &str) -> Result<BrokerWriter<B>, QueueError> {
        let address = QueueAddress::parse(queue, self.multiplexed);
        let sender = self.open_sender(&address).await?;
        Ok(BrokerWriter {
            factory: self.clone(),
            address,
            sender: Mutex::new(Some(sender)),
        })
    }

    async fn close(&self) -> Result<(), QueueError> {
        let mut guard = self.connection.lock().await;
        match guard.take() {
            Some(conn) => self.broker.disconnect(&conn).await,
            None => Ok(()),
        }
    }
}

/// Writer for one logical queue
pub struct BrokerWriter<B: Broker> {
    factory: BrokerWriterFactory<B>,
    address: QueueAddress,
    sender: Mutex<Option<B::Sender>>,
}

impl<B: Broker> BrokerWriter<B> {
    pub fn address(&self) -> &QueueAddress {
        &self.address
    }
}

#[async_trait]
impl<B: Broker> QueueWriter for BrokerWriter<B> {
    /// Publish, reopening the sender once if the current one fails.
    async fn write(&self, message: &str) -> Result<(), QueueError> {
        let broker = &self.factory.broker;
        let mut guard = self.sender.lock().await;

        if let Some(sender) = guard.as_ref() {
            match broker.publish(sender, &self.address, message.as_bytes()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(queue = %self.address, error = %e, "publish failed, reopening sender");
                }
            }
            if let Some(old) = guard.take() {
                let _ = broker.close_sender(old).await;
            }
        }

        let sender = self.factory.open_sender(&self.address).await?;
        let result = broker
            .publish(&sender, &self.address, message.as_bytes())
            .await;
        *guard = Some(sender);
        result
    }

    async fn close(self) -> Result<(), QueueError> {
        let Some(sender) = self.sender.into_inner() else {
            return Ok(());
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, self.factory.broker.close_sender(sender)).await {
            Ok(result) => result,
            Err(_) => Err(QueueError::Close(format!(
                "closing writer for {} timed out",
                self.address
            ))),
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
