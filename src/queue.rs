// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Management for RabbitMQ
//!
//! Queue definitions are built from a lifetime class rather than from individual
//! durability flags, so a queue is always either fully durable or fully transient.
//! Dead-letter routing is attached at declaration time through queue arguments and
//! is handled by the broker from then on.

use lapin::{
    options::QueueDeclareOptions,
    types::{AMQPValue, FieldTable, LongString, ShortString},
};
use std::collections::BTreeMap;

/// Queue argument naming the dead-letter exchange
pub const AMQP_HEADERS_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";

/// The durability policy of a queue.
///
/// - Durable: survives a broker restart, is never auto-deleted and may be shared by
///   consumers on any connection.
/// - Transient: deleted when its last consumer goes away and exclusive to the
///   connection that declared it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueueLifetime {
    #[default]
    Durable,
    Transient,
}

/// The three broker declaration flags implied by a [`QueueLifetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeFlags {
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
}

impl QueueLifetime {
    /// Returns the declaration flags for this lifetime.
    pub fn flags(self) -> LifetimeFlags {
        match self {
            QueueLifetime::Durable => LifetimeFlags {
                durable: true,
                auto_delete: false,
                exclusive: false,
            },
            QueueLifetime::Transient => LifetimeFlags {
                durable: false,
                auto_delete: true,
                exclusive: true,
            },
        }
    }
}

/// Definition of a RabbitMQ queue with its configuration parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) lifetime: QueueLifetime,
    pub(crate) dead_letter_exchange: Option<String>,
}

impl QueueDefinition {
    /// Creates a durable queue definition with the given name and no extra arguments.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the durability policy, which fixes the durable, auto-delete and
    /// exclusive declaration flags together.
    pub fn lifetime(mut self, lifetime: QueueLifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Shorthand for `lifetime(QueueLifetime::Durable)`.
    pub fn durable(self) -> Self {
        self.lifetime(QueueLifetime::Durable)
    }

    /// Shorthand for `lifetime(QueueLifetime::Transient)`.
    pub fn transient(self) -> Self {
        self.lifetime(QueueLifetime::Transient)
    }

    /// Routes rejected messages from this queue to `exchange`.
    pub fn dead_letter_exchange(mut self, exchange: &str) -> Self {
        self.dead_letter_exchange = Some(exchange.to_owned());
        self
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        let flags = self.lifetime.flags();

        QueueDeclareOptions {
            passive: false,
            durable: flags.durable,
            exclusive: flags.exclusive,
            auto_delete: flags.auto_delete,
            nowait: false,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        let mut args = BTreeMap::new();

        if let Some(exchange) = &self.dead_letter_exchange {
            args.insert(
                ShortString::from(AMQP_HEADERS_DEAD_LETTER_EXCHANGE),
                AMQPValue::LongString(LongString::from(exchange.clone())),
            );
        }

        FieldTable::from(args)
    }
}

/// Configuration for binding a queue to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub(crate) queue_name: String,
    pub(crate) exchange_name: String,
    pub(crate) routing_key: String,
}

impl QueueBinding {
    /// Creates a binding for `queue`; exchange and key default to empty strings.
    pub fn new(queue: &str) -> QueueBinding {
        QueueBinding {
            queue_name: queue.to_owned(),
            exchange_name: String::new(),
            routing_key: String::new(),
        }
    }

    /// Sets the exchange the queue is bound to.
    pub fn exchange(mut self, exchange: &str) -> Self {
        self.exchange_name = exchange.to_owned();
        self
    }

    /// Sets the routing key, or the pattern for topic exchanges.
    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_key = key.to_owned();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_lifetime_flags() {
        assert_eq!(
            QueueLifetime::Transient.flags(),
            LifetimeFlags {
                durable: false,
                auto_delete: true,
                exclusive: true,
            }
        );
    }

    #[test]
    fn durable_lifetime_flags() {
        assert_eq!(
            QueueLifetime::Durable.flags(),
            LifetimeFlags {
                durable: true,
                auto_delete: false,
                exclusive: false,
            }
        );
    }

    #[test]
    fn declare_options_follow_lifetime() {
        let opts = QueueDefinition::new("pause.alice")
            .transient()
            .declare_options();
        assert!(!opts.durable);
        assert!(opts.auto_delete);
        assert!(opts.exclusive);
        assert!(!opts.passive);

        let opts = QueueDefinition::new("war").durable().declare_options();
        assert!(opts.durable);
        assert!(!opts.auto_delete);
        assert!(!opts.exclusive);
    }

    #[test]
    fn arguments_carry_dead_letter_exchange() {
        let args = QueueDefinition::new("war")
            .dead_letter_exchange("peril_dlx")
            .arguments();

        assert_eq!(
            args.inner()
                .get(&ShortString::from(AMQP_HEADERS_DEAD_LETTER_EXCHANGE)),
            Some(&AMQPValue::LongString(LongString::from("peril_dlx")))
        );
    }

    #[test]
    fn arguments_are_empty_by_default() {
        assert!(QueueDefinition::new("q").arguments().inner().is_empty());
    }

    #[test]
    fn binding_builder_sets_fields() {
        let binding = QueueBinding::new("war")
            .exchange("peril_topic")
            .routing_key("war.*");

        assert_eq!(binding.queue_name, "war");
        assert_eq!(binding.exchange_name, "peril_topic");
        assert_eq!(binding.routing_key, "war.*");
    }
}
