// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions
//!
//! Exchanges are the routing nodes that receive published messages and forward them
//! to bound queues. The game uses a direct exchange for server broadcasts, a topic
//! exchange for player traffic, and a fanout exchange for dead letters.

use lapin::{options::ExchangeDeclareOptions, types::FieldTable};

/// Represents the types of exchanges available in RabbitMQ.
///
/// - Direct: Routes messages to queues based on an exact match of routing keys
/// - Fanout: Broadcasts messages to all bound queues regardless of routing keys
/// - Topic: Routes messages by matching `*` / `#` patterns against routing keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
}

impl From<&ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: &ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Definition of a RabbitMQ exchange with its configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition {
    pub(crate) name: String,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
}

impl ExchangeDefinition {
    /// Creates a new exchange definition with the given name.
    ///
    /// By default, the exchange is a non-durable Direct exchange.
    pub fn new(name: &str) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.to_owned(),
            kind: ExchangeKind::Direct,
            durable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the routing type of the exchange.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Shorthand for `kind(ExchangeKind::Direct)`.
    pub fn direct(self) -> Self {
        self.kind(ExchangeKind::Direct)
    }

    /// Shorthand for `kind(ExchangeKind::Fanout)`.
    pub fn fanout(self) -> Self {
        self.kind(ExchangeKind::Fanout)
    }

    /// Shorthand for `kind(ExchangeKind::Topic)`.
    pub fn topic(self) -> Self {
        self.kind(ExchangeKind::Topic)
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub(crate) fn declare_options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.durable,
            auto_delete: false,
            internal: false,
            nowait: false,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        FieldTable::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_durable_topic_exchange() {
        let def = ExchangeDefinition::new("peril_topic").topic().durable();

        assert_eq!(def.name(), "peril_topic");
        assert_eq!(def.kind, ExchangeKind::Topic);

        let opts = def.declare_options();
        assert!(opts.durable);
        assert!(!opts.auto_delete);
        assert!(!opts.internal);
        assert!(!opts.passive);
    }

    #[test]
    fn maps_kinds_to_lapin() {
        assert!(matches!(
            lapin::ExchangeKind::from(&ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        ));
        assert!(matches!(
            lapin::ExchangeKind::from(&ExchangeKind::Topic),
            lapin::ExchangeKind::Topic
        ));
    }

    #[test]
    fn exchanges_are_transient_unless_marked_durable() {
        let def = ExchangeDefinition::new("peril_dlx").fanout();

        assert_eq!(def.kind, ExchangeKind::Fanout);
        assert!(!def.declare_options().durable);
        assert!(def.arguments().inner().is_empty());
    }
}
