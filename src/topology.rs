// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Management
//!
//! This module declares the broker-side routing topology: exchanges, queues, and the
//! bindings between them. Declarations are idempotent on the broker, so installing
//! the same topology twice is harmless, while redeclaring a queue with different
//! flags fails and is reported as a fatal [`TopologyError`].
//!
//! The main components are:
//! - `Topology` trait: Interface for topology management
//! - `AmqpTopology`: Implementation of the Topology trait for RabbitMQ
//! - `declare_and_bind`: per-subscription declaration on a fresh channel

use crate::{
    channel::new_amqp_channel,
    errors::TopologyError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition, QueueLifetime},
    routing::EXCHANGE_PERIL_DLX,
};
use async_trait::async_trait;
use lapin::{options::QueueBindOptions, types::FieldTable, Channel, Connection};
use std::sync::Arc;
use tracing::{debug, error};

/// Identity of a queue as resolved by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredQueue {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

/// Trait defining the interface for topology management.
#[async_trait]
pub trait Topology {
    /// Adds an exchange definition to the topology.
    fn exchange(self, def: ExchangeDefinition) -> Self;

    /// Adds a queue definition to the topology.
    fn queue(self, def: QueueDefinition) -> Self;

    /// Adds a queue-to-exchange binding to the topology.
    fn queue_binding(self, binding: QueueBinding) -> Self;

    /// Declares exchanges, then queues, then bindings on the broker.
    async fn install(&self) -> Result<Vec<DeclaredQueue>, TopologyError>;
}

/// RabbitMQ implementation of the Topology trait.
pub struct AmqpTopology {
    channel: Arc<Channel>,
    pub(crate) queues: Vec<QueueDefinition>,
    pub(crate) queues_binding: Vec<QueueBinding>,
    pub(crate) exchanges: Vec<ExchangeDefinition>,
}

impl AmqpTopology {
    pub fn new(channel: Arc<Channel>) -> AmqpTopology {
        AmqpTopology {
            channel,
            queues: vec![],
            queues_binding: vec![],
            exchanges: vec![],
        }
    }
}

#[async_trait]
impl Topology for AmqpTopology {
    fn exchange(mut self, def: ExchangeDefinition) -> Self {
        self.exchanges.push(def);
        self
    }

    fn queue(mut self, def: QueueDefinition) -> Self {
        self.queues.push(def);
        self
    }

    fn queue_binding(mut self, binding: QueueBinding) -> Self {
        self.queues_binding.push(binding);
        self
    }

    async fn install(&self) -> Result<Vec<DeclaredQueue>, TopologyError> {
        self.install_exchange().await?;
        let queues = self.install_queue().await?;
        self.binding_queues().await?;

        Ok(queues)
    }
}

impl AmqpTopology {
    async fn install_exchange(&self) -> Result<(), TopologyError> {
        for exch in &self.exchanges {
            debug!("creating exchange: {}", exch.name);

            match self
                .channel
                .exchange_declare(
                    &exch.name,
                    (&exch.kind).into(),
                    exch.declare_options(),
                    exch.arguments(),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = %exch.name,
                        "error to declare the exchange"
                    );
                    Err(TopologyError::DeclareExchangeError(exch.name.clone()))
                }
                _ => Ok(()),
            }?;

            debug!("exchange: {} was created", exch.name);
        }

        Ok(())
    }

    async fn install_queue(&self) -> Result<Vec<DeclaredQueue>, TopologyError> {
        let mut declared = Vec::with_capacity(self.queues.len());

        for def in &self.queues {
            debug!("creating queue: {}", def.name);

            let queue = match self
                .channel
                .queue_declare(&def.name, def.declare_options(), def.arguments())
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = %def.name,
                        "error to declare the queue"
                    );
                    Err(TopologyError::DeclareQueueError(def.name.clone()))
                }
                Ok(queue) => Ok(queue),
            }?;

            debug!("queue: {} was created", def.name);

            declared.push(DeclaredQueue {
                name: queue.name().as_str().to_owned(),
                message_count: queue.message_count(),
                consumer_count: queue.consumer_count(),
            });
        }

        Ok(declared)
    }

    async fn binding_queues(&self) -> Result<(), TopologyError> {
        for binding in &self.queues_binding {
            debug!(
                "binding queue: {} to the exchange: {} with the key: {}",
                binding.queue_name, binding.exchange_name, binding.routing_key
            );

            match self
                .channel
                .queue_bind(
                    &binding.queue_name,
                    &binding.exchange_name,
                    &binding.routing_key,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), "error to bind queue to exchange");

                    Err(TopologyError::BindingExchangeToQueueError(
                        binding.exchange_name.clone(),
                        binding.queue_name.clone(),
                    ))
                }
                _ => Ok(()),
            }?;
        }

        Ok(())
    }
}

/// Builds the queue definition used by [`declare_and_bind`]: lifetime-derived flags
/// plus dead-letter routing to the shared dead-letter exchange.
pub fn subscription_queue(queue_name: &str, lifetime: QueueLifetime) -> QueueDefinition {
    QueueDefinition::new(queue_name)
        .lifetime(lifetime)
        .dead_letter_exchange(EXCHANGE_PERIL_DLX)
}

/// Ensures `queue_name` exists with the flags of `lifetime`, dead-letters to the
/// shared dead-letter exchange, and is bound to `exchange` under `binding_key`.
///
/// Returns the fresh channel the declaration ran on, ready to publish or consume,
/// together with the resolved queue identity.
pub async fn declare_and_bind(
    conn: &Connection,
    exchange: &str,
    queue_name: &str,
    binding_key: &str,
    lifetime: QueueLifetime,
) -> Result<(Arc<Channel>, DeclaredQueue), TopologyError> {
    let channel = new_amqp_channel(conn).await?;

    let declared = AmqpTopology::new(channel.clone())
        .queue(subscription_queue(queue_name, lifetime))
        .queue_binding(
            QueueBinding::new(queue_name)
                .exchange(exchange)
                .routing_key(binding_key),
        )
        .install()
        .await?;

    let queue = declared
        .into_iter()
        .next()
        .ok_or_else(|| TopologyError::DeclareQueueError(queue_name.to_owned()))?;

    Ok((channel, queue))
}
