// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscription Loop
//!
//! The loop pulls deliveries off a stream one at a time, decodes each payload,
//! awaits the handler, and settles the delivery according to the handler's
//! [`AckType`]. Per-delivery failures (undecodable payloads, failed acknowledgments)
//! are logged and never end the loop; only the end of the stream does.

use crate::{
    codec::Codec,
    errors::AckError,
    handler::{AckType, ConsumerHandler},
    otel,
};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use lapin::{
    acker::Acker,
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
    protocol::basic::AMQPProperties,
};
#[cfg(test)]
use mockall::automock;
use opentelemetry::{
    global,
    trace::{Span, Status},
    KeyValue,
};
use serde::de::DeserializeOwned;
use std::{borrow::Cow, fmt::Display};
use tracing::{debug, error, warn};

/// Single-use handle settling one delivery with the broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<(), AckError>;

    async fn nack(&self, requeue: bool) -> Result<(), AckError>;
}

#[async_trait]
impl Acknowledger for Acker {
    async fn ack(&self) -> Result<(), AckError> {
        Acker::ack(self, BasicAckOptions { multiple: false })
            .await
            .map_err(|err| AckError::AckMessageError(err.to_string()))
    }

    async fn nack(&self, requeue: bool) -> Result<(), AckError> {
        Acker::nack(
            self,
            BasicNackOptions {
                multiple: false,
                requeue,
            },
        )
        .await
        .map_err(|err| {
            if requeue {
                AckError::RequeuingMessageError(err.to_string())
            } else {
                AckError::NackMessageError(err.to_string())
            }
        })
    }
}

/// One message handed over by the broker, with the handle used to settle it.
pub struct InboundDelivery {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub redelivered: bool,
    pub properties: AMQPProperties,
    pub data: Vec<u8>,
    pub acker: Box<dyn Acknowledger>,
}

impl From<Delivery> for InboundDelivery {
    fn from(delivery: Delivery) -> Self {
        InboundDelivery {
            delivery_tag: delivery.delivery_tag,
            exchange: delivery.exchange.as_str().to_owned(),
            routing_key: delivery.routing_key.as_str().to_owned(),
            redelivered: delivery.redelivered,
            properties: delivery.properties,
            data: delivery.data,
            acker: Box::new(delivery.acker),
        }
    }
}

/// What the loop does with a delivery whose payload cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeFailure {
    /// Leave the delivery unsettled. The broker redelivers it once this consumer's
    /// channel goes away.
    #[default]
    Abandon,
    /// Reject without requeue, sending the delivery to the dead-letter exchange.
    DeadLetter,
}

/// Settles `acker` according to `verdict` with exactly one broker call.
pub(crate) async fn settle(acker: &dyn Acknowledger, verdict: AckType) -> Result<(), AckError> {
    match verdict {
        AckType::Ack => acker.ack().await,
        AckType::NackDiscard => acker.nack(false).await,
        AckType::NackRequeue => acker.nack(true).await,
    }
}

/// Decodes, dispatches and settles a single delivery.
pub(crate) async fn consume<T, C, H>(
    queue: &str,
    delivery: InboundDelivery,
    codec: &C,
    handler: &H,
    on_decode_failure: DecodeFailure,
) where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
    H: ConsumerHandler<T> + ?Sized,
{
    let (ctx, mut span) = otel::consumer_span(
        &delivery.properties,
        &global::tracer(otel::CONSUMER_TRACER),
        queue,
    );

    debug!(
        queue,
        exchange = %delivery.exchange,
        routing_key = %delivery.routing_key,
        redelivered = delivery.redelivered,
        "received delivery"
    );

    let msg = match codec.decode::<T>(&delivery.data) {
        Ok(msg) => msg,
        Err(err) => {
            error!(
                error = err.to_string(),
                queue,
                delivery_tag = delivery.delivery_tag,
                "could not decode message"
            );
            span.record_error(&err);
            span.set_status(Status::Error {
                description: Cow::from("failure to decode payload"),
            });

            if on_decode_failure == DecodeFailure::DeadLetter {
                if let Err(err) = settle(&*delivery.acker, AckType::NackDiscard).await {
                    error!(error = err.to_string(), queue, "error whiling nack msg");
                }
            }

            span.end();
            return;
        }
    };

    let verdict = handler.exec(&ctx, msg).await;
    span.set_attribute(KeyValue::new("messaging.verdict", verdict.to_string()));

    if verdict == AckType::NackRequeue {
        warn!(queue, delivery_tag = delivery.delivery_tag, "requeuing message");
    }

    match settle(&*delivery.acker, verdict).await {
        Ok(()) => {
            debug!(queue, %verdict, "message settled");
            span.set_status(Status::Ok);
        }
        Err(err) => {
            error!(error = err.to_string(), queue, %verdict, "error whiling settling msg");
            span.record_error(&err);
            span.set_status(Status::Error {
                description: Cow::from("failure to settle message"),
            });
        }
    }

    span.end();
}

/// Runs until `deliveries` ends, handling one delivery at a time.
pub(crate) async fn consume_stream<T, C, H, S, E>(
    queue: &str,
    deliveries: S,
    codec: &C,
    handler: &H,
    on_decode_failure: DecodeFailure,
) where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
    H: ConsumerHandler<T> + ?Sized,
    S: Stream<Item = Result<InboundDelivery, E>>,
    E: Display,
{
    let mut deliveries = std::pin::pin!(deliveries);

    while let Some(result) = deliveries.next().await {
        match result {
            Ok(delivery) => consume(queue, delivery, codec, handler, on_decode_failure).await,
            Err(err) => error!(error = err.to_string(), queue, "errors consume msg"),
        }
    }

    debug!(queue, "delivery stream closed");
}
