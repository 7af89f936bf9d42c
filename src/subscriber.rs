// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Subscriptions
//!
//! `subscribe` declares and binds the queue on a dedicated channel, registers a
//! manual-ack consumer on it, and spawns the subscription loop as its own tokio
//! task. Setup failures are returned before anything is spawned; once the task is
//! running it lives until the broker closes the delivery stream.

use crate::{
    channel::ChannelGuard,
    codec::Codec,
    consumer::{consume_stream, DecodeFailure, InboundDelivery},
    errors::SubscribeError,
    handler::ConsumerHandler,
    queue::QueueLifetime,
    topology::declare_and_bind,
};
use futures_util::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, BasicQosOptions},
    types::FieldTable,
    Connection,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Default prefetch window. Zero leaves the window unlimited and skips `basic.qos`.
pub const DEFAULT_PREFETCH_COUNT: u16 = 0;

/// Per-subscription consumer settings.
///
/// A prefetch window caps how many unsettled deliveries the broker hands to this
/// consumer. Deliveries abandoned by [`DecodeFailure::Abandon`] stay unsettled until
/// the channel closes and so hold a slot each; enough of them would stop the broker
/// from delivering anything more. A bounded window therefore requires
/// [`DecodeFailure::DeadLetter`], and [`SubscribeOptions::validate`] rejects the
/// other combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub prefetch_count: u16,
    pub decode_failure: DecodeFailure,
    /// Empty lets the broker generate the tag.
    pub consumer_tag: String,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        SubscribeOptions {
            prefetch_count: DEFAULT_PREFETCH_COUNT,
            decode_failure: DecodeFailure::default(),
            consumer_tag: String::new(),
        }
    }
}

impl SubscribeOptions {
    /// Bounds the number of unsettled deliveries in flight. Zero means unlimited.
    pub fn prefetch_count(mut self, count: u16) -> Self {
        self.prefetch_count = count;
        self
    }

    /// Chooses what happens to deliveries whose payload cannot be decoded.
    pub fn decode_failure(mut self, policy: DecodeFailure) -> Self {
        self.decode_failure = policy;
        self
    }

    /// Sets the consumer tag reported to the broker.
    pub fn consumer_tag(mut self, tag: &str) -> Self {
        self.consumer_tag = tag.to_owned();
        self
    }

    /// Checks that abandoned deliveries can never exhaust the prefetch window.
    ///
    /// # Returns
    /// `SubscribeError::InvalidOptions` when a bounded window is combined with
    /// [`DecodeFailure::Abandon`]
    pub fn validate(&self) -> Result<(), SubscribeError> {
        if self.prefetch_count > 0 && self.decode_failure == DecodeFailure::Abandon {
            return Err(SubscribeError::InvalidOptions(format!(
                "prefetch {} requires dead-lettering undecodable deliveries",
                self.prefetch_count
            )));
        }

        Ok(())
    }
}

pub(crate) fn consume_options() -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_local: false,
        no_ack: false,
        exclusive: false,
        nowait: false,
    }
}

/// Subscribes `handler` to `queue_name` with the default [`SubscribeOptions`].
pub async fn subscribe<T, C, H>(
    conn: &Connection,
    exchange: &str,
    queue_name: &str,
    binding_key: &str,
    lifetime: QueueLifetime,
    codec: C,
    handler: Arc<H>,
) -> Result<JoinHandle<()>, SubscribeError>
where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
    H: ConsumerHandler<T> + ?Sized + 'static,
{
    subscribe_with(
        conn,
        exchange,
        queue_name,
        binding_key,
        lifetime,
        codec,
        handler,
        SubscribeOptions::default(),
    )
    .await
}

/// Declares and binds `queue_name`, then spawns a loop feeding its deliveries to
/// `handler`.
///
/// # Parameters
/// * `conn` - Shared connection; the subscription opens its own channel on it
/// * `exchange` - Exchange the queue is bound to
/// * `queue_name` - Queue to declare and consume
/// * `binding_key` - Routing key or pattern of the binding
/// * `lifetime` - Durability policy of the queue
/// * `codec` - Format used to decode payloads
/// * `handler` - Receives each decoded message and returns its verdict
/// * `opts` - Prefetch, decode-failure policy and consumer tag
///
/// # Returns
/// The handle of the loop task, which completes when the broker closes the
/// delivery stream. The loop's channel is closed when the task ends, however it
/// ends. Invalid options and setup failures are returned before anything is spawned.
#[allow(clippy::too_many_arguments)]
pub async fn subscribe_with<T, C, H>(
    conn: &Connection,
    exchange: &str,
    queue_name: &str,
    binding_key: &str,
    lifetime: QueueLifetime,
    codec: C,
    handler: Arc<H>,
    opts: SubscribeOptions,
) -> Result<JoinHandle<()>, SubscribeError>
where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
    H: ConsumerHandler<T> + ?Sized + 'static,
{
    opts.validate()?;

    let (channel, queue) = declare_and_bind(conn, exchange, queue_name, binding_key, lifetime).await?;
    let guard = ChannelGuard::new(channel.clone());

    if opts.prefetch_count > 0 {
        if let Err(err) = channel
            .basic_qos(opts.prefetch_count, BasicQosOptions { global: false })
            .await
        {
            error!(error = err.to_string(), queue = %queue.name, "error to configure qos");
            return Err(SubscribeError::QoSDeclarationError(err.to_string()));
        }
    }

    let consumer = match channel
        .basic_consume(
            &queue.name,
            &opts.consumer_tag,
            consume_options(),
            FieldTable::default(),
        )
        .await
    {
        Err(err) => {
            error!(error = err.to_string(), queue = %queue.name, "error to create the consumer");
            Err(SubscribeError::ConsumerDeclarationError(err.to_string()))
        }
        Ok(c) => Ok(c),
    }?;

    let tag = consumer.tag();
    info!(
        queue = %queue.name,
        exchange,
        binding_key,
        consumer_tag = tag.as_str(),
        "subscription started"
    );

    let queue_name = queue.name;
    let decode_failure = opts.decode_failure;

    Ok(tokio::spawn(async move {
        let _guard = guard;
        let deliveries = consumer.map(|result| result.map(InboundDelivery::from));

        consume_stream(&queue_name, deliveries, &codec, handler.as_ref(), decode_failure).await;

        debug!(queue = %queue_name, "subscription finished");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{new_amqp_channel, new_amqp_connection},
        codec::JsonCodec,
        configs::RabbitMQConfigs,
        errors::TopologyError,
        game::{bootstrap_game_topology, publish_pause},
        handler::{handler_fn, AckType},
        publisher::RabbitMQPublisher,
        routing::{PlayingState, EXCHANGE_PERIL_DIRECT, PAUSE_KEY},
    };
    use lapin::options::QueueDeleteOptions;
    use opentelemetry::Context;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[test]
    fn consumes_with_manual_acknowledgment() {
        let opts = consume_options();
        assert!(!opts.no_ack);
        assert!(!opts.exclusive);
        assert!(!opts.no_local);
        assert!(!opts.nowait);
    }

    #[test]
    fn default_options() {
        let opts = SubscribeOptions::default();
        assert_eq!(opts.prefetch_count, DEFAULT_PREFETCH_COUNT);
        assert_eq!(opts.decode_failure, DecodeFailure::Abandon);
        assert!(opts.consumer_tag.is_empty());
    }

    #[test]
    fn default_options_leave_the_window_unbounded() {
        let opts = SubscribeOptions::default();
        assert_eq!(opts.prefetch_count, 0);
        assert_eq!(opts.validate(), Ok(()));
    }

    #[test]
    fn bounded_window_requires_dead_lettering() {
        let opts = SubscribeOptions::default().prefetch_count(10);
        assert!(matches!(
            opts.validate(),
            Err(SubscribeError::InvalidOptions(_))
        ));

        let opts = opts.decode_failure(DecodeFailure::DeadLetter);
        assert_eq!(opts.validate(), Ok(()));
    }

    #[test]
    fn builder_overrides_options() {
        let opts = SubscribeOptions::default()
            .prefetch_count(1)
            .decode_failure(DecodeFailure::DeadLetter)
            .consumer_tag("war.alice");

        assert_eq!(opts.prefetch_count, 1);
        assert_eq!(opts.decode_failure, DecodeFailure::DeadLetter);
        assert_eq!(opts.consumer_tag, "war.alice");
    }

    #[tokio::test]
    #[ignore] // Requires RabbitMQ server
    async fn missing_exchange_fails_before_spawning() {
        let conn = new_amqp_connection(&RabbitMQConfigs::load().unwrap())
            .await
            .unwrap();
        let exchange = format!("peril_missing_{}", Uuid::new_v4());
        let queue_name = format!("pause.{}", Uuid::new_v4());

        let result = subscribe::<PlayingState, _, _>(
            &conn,
            &exchange,
            &queue_name,
            PAUSE_KEY,
            QueueLifetime::Transient,
            JsonCodec,
            Arc::new(handler_fn(|_: PlayingState| AckType::Ack)),
        )
        .await;

        assert!(matches!(
            result,
            Err(SubscribeError::Topology(TopologyError::BindingExchangeToQueueError(ref ex, _)))
                if *ex == exchange
        ));

        conn.close(200, "test finished").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires RabbitMQ server
    async fn pause_broadcast_is_received_and_acked() {
        let conn = new_amqp_connection(&RabbitMQConfigs::load().unwrap())
            .await
            .unwrap();
        bootstrap_game_topology(&conn).await.unwrap();

        let queue_name = format!("pause.{}", Uuid::new_v4());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = Arc::new(handler_fn(move |state: PlayingState| {
            tx.send(state).unwrap();
            AckType::Ack
        }));

        let subscription = subscribe::<PlayingState, _, _>(
            &conn,
            EXCHANGE_PERIL_DIRECT,
            &queue_name,
            PAUSE_KEY,
            QueueLifetime::Durable,
            JsonCodec,
            handler,
        )
        .await
        .unwrap();

        let publisher = RabbitMQPublisher::new(new_amqp_channel(&conn).await.unwrap());
        publish_pause(
            publisher.as_ref(),
            &Context::new(),
            &PlayingState { is_paused: true },
        )
        .await
        .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(PlayingState { is_paused: true }));

        // an unacked delivery would return to the queue once the loop's channel closes
        tokio::time::sleep(Duration::from_millis(500)).await;
        subscription.abort();
        let _ = subscription.await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (channel, queue) = declare_and_bind(
            &conn,
            EXCHANGE_PERIL_DIRECT,
            &queue_name,
            PAUSE_KEY,
            QueueLifetime::Durable,
        )
        .await
        .unwrap();
        assert_eq!(queue.message_count, 0);

        channel
            .queue_delete(&queue_name, QueueDeleteOptions::default())
            .await
            .unwrap();
        conn.close(200, "test finished").await.unwrap();
    }
}
