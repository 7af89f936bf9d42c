// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! Publishing is fire-and-forget. Messages are sent with `mandatory` and `immediate`
//! disabled and no publisher confirm is awaited, so an unroutable message is dropped
//! by the broker without an error. A successful publish means the local channel
//! accepted the frame, never that anyone received it.

use crate::{codec::Codec, errors::PublishError, otel};
use async_trait::async_trait;
use lapin::{
    options::BasicPublishOptions,
    types::{FieldTable, ShortString},
    BasicProperties, Channel,
};
#[cfg(test)]
use mockall::automock;
use opentelemetry::Context;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// An encoded message ready to hand to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMessage {
    pub exchange: String,
    pub key: String,
    pub content_type: String,
    pub msg_type: Option<String>,
    pub data: Vec<u8>,
}

impl PublishMessage {
    /// Encodes `value` with `codec`. Nothing reaches the network if this fails.
    pub fn encode<T, C>(exchange: &str, key: &str, value: &T, codec: &C) -> Result<Self, PublishError>
    where
        T: Serialize + ?Sized,
        C: Codec,
    {
        Ok(PublishMessage {
            exchange: exchange.to_owned(),
            key: key.to_owned(),
            content_type: codec.content_type().to_owned(),
            msg_type: None,
            data: codec.encode(value)?,
        })
    }

    /// Sets the AMQP `type` property.
    pub fn msg_type(mut self, msg_type: &str) -> Self {
        self.msg_type = Some(msg_type.to_owned());
        self
    }
}

/// Hands encoded messages to the broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Sends `msg` with the trace context of `ctx` in its headers.
    ///
    /// # Returns
    /// `Ok(())` once the local channel accepted the message, or
    /// `PublishError::TransportError` when the channel rejected it
    async fn publish(&self, ctx: &Context, msg: &PublishMessage) -> Result<(), PublishError>;
}

/// Encodes `value` with `codec` and publishes it to `exchange` under `key`.
pub async fn publish<T, C>(
    publisher: &dyn Publisher,
    ctx: &Context,
    exchange: &str,
    key: &str,
    value: &T,
    codec: &C,
) -> Result<(), PublishError>
where
    T: Serialize + ?Sized,
    C: Codec,
{
    let msg = PublishMessage::encode(exchange, key, value, codec)?;
    publisher.publish(ctx, &msg).await
}

/// Builds the AMQP properties of `msg`: codec content type, a fresh message id, the
/// optional message type, and the trace context of `ctx` as headers.
pub(crate) fn message_properties(ctx: &Context, msg: &PublishMessage) -> BasicProperties {
    let props = BasicProperties::default()
        .with_content_type(ShortString::from(msg.content_type.clone()))
        .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
        .with_headers(FieldTable::from(otel::inject_context(ctx)));

    match &msg.msg_type {
        Some(msg_type) => props.with_type(ShortString::from(msg_type.clone())),
        None => props,
    }
}

/// Publisher backed by a dedicated lapin channel.
pub struct RabbitMQPublisher {
    channel: Arc<Channel>,
}

impl RabbitMQPublisher {
    pub fn new(channel: Arc<Channel>) -> Arc<RabbitMQPublisher> {
        Arc::new(RabbitMQPublisher { channel })
    }
}

#[async_trait]
impl Publisher for RabbitMQPublisher {
    async fn publish(&self, ctx: &Context, msg: &PublishMessage) -> Result<(), PublishError> {
        let props = message_properties(ctx, msg);

        match self
            .channel
            .basic_publish(
                &msg.exchange,
                &msg.key,
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &msg.data,
                props,
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    exchange = %msg.exchange,
                    key = %msg.key,
                    "error publishing message"
                );
                Err(PublishError::TransportError(err.to_string()))
            }
            _ => {
                debug!(exchange = %msg.exchange, key = %msg.key, "message published");
                Ok(())
            }
        }
    }
}
