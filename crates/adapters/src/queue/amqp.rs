// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AMQP 0-9-1 broker over lapin

use super::{Broker, QueueAddress, QueueError};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::uri::AMQPUri;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

/// Message header carrying the multiplexing key.
pub const GROUP_HEADER: &str = "x-group-id";

/// Persistent delivery mode.
const PERSISTENT: u8 = 2;

/// Broker endpoint and credentials
#[derive(Clone, Default)]
pub struct AmqpSettings {
    /// `amqp://host:port/vhost`
    pub address: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AmqpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpSettings")
            .field("address", &self.address)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AmqpSettings {
    fn uri(&self) -> Result<AMQPUri, QueueError> {
        let mut uri: AMQPUri = self
            .address
            .parse()
            .map_err(|e: String| QueueError::Connect(format!("invalid address: {}", e)))?;
        if !self.username.is_empty() {
            uri.authority.userinfo.username = self.username.clone();
            uri.authority.userinfo.password = self.password.clone();
        }
        Ok(uri)
    }
}

/// Broker speaking AMQP 0-9-1 with publisher confirms
#[derive(Clone, Debug)]
pub struct AmqpBroker {
    settings: AmqpSettings,
}

impl AmqpBroker {
    pub fn new(settings: AmqpSettings) -> Self {
        Self { settings }
    }
}

fn open_error(queue: &str, err: lapin::Error) -> QueueError {
    QueueError::Open {
        queue: queue.to_string(),
        reason: err.to_string(),
    }
}

fn publish_error(address: &QueueAddress, reason: impl ToString) -> QueueError {
    QueueError::Publish {
        queue: address.to_string(),
        reason: reason.to_string(),
    }
}

/// Persistent delivery, tagged with the group key when multiplexed.
pub(crate) fn message_properties(address: &QueueAddress) -> BasicProperties {
    let properties = BasicProperties::default().with_delivery_mode(PERSISTENT);
    match &address.group {
        Some(group) => {
            let mut headers = FieldTable::default();
            headers.insert(GROUP_HEADER.into(), AMQPValue::LongString(group.clone().into()));
            properties.with_headers(headers)
        }
        None => properties,
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    type Connection = Connection;
    type Sender = Channel;

    async fn connect(&self) -> Result<Connection, QueueError> {
        let uri = self.settings.uri()?;
        Connection::connect_uri(uri, ConnectionProperties::default())
            .await
            .map_err(|e| QueueError::Connect(e.to_string()))
    }

    fn is_connected(&self, connection: &Connection) -> bool {
        connection.status().connected()
    }

    async fn open(&self, connection: &Connection, queue: &str) -> Result<Channel, QueueError> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| open_error(queue, e))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| open_error(queue, e))?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| open_error(queue, e))?;
        Ok(channel)
    }

    async fn publish(
        &self,
        sender: &Channel,
        address: &QueueAddress,
        body: &[u8],
    ) -> Result<(), QueueError> {
        let confirm = sender
            .basic_publish(
                "",
                &address.queue,
                BasicPublishOptions::default(),
                body,
                message_properties(address),
            )
            .await
            .map_err(|e| publish_error(address, e))?;
        let confirmation = confirm.await.map_err(|e| publish_error(address, e))?;
        if confirmation.is_nack() {
            return Err(publish_error(address, "broker rejected the message"));
        }
        Ok(())
    }

    async fn close_sender(&self, sender: Channel) -> Result<(), QueueError> {
        if !sender.status().connected() {
            return Ok(());
        }
        sender
            .close(200, "writer closed")
            .await
            .map_err(|e| QueueError::Close(e.to_string()))
    }

    async fn disconnect(&self, connection: &Connection) -> Result<(), QueueError> {
        if !connection.status().connected() {
            return Ok(());
        }
        connection
            .close(200, "shutting down")
            .await
            .map_err(|e| QueueError::Close(e.to_string()))
    }
}

#[cfg(test)]
#[path = "amqp_tests.rs"]
mod tests;
