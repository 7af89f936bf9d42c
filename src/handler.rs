// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consumer Handlers and Acknowledgment Verdicts
//!
//! A handler receives one decoded message and answers with an [`AckType`] telling the
//! subscription loop how to settle the delivery with the broker.

use async_trait::async_trait;
use opentelemetry::Context;
use std::fmt;

/// The settlement a handler asks for.
///
/// - `Ack`: the delivery is removed from the queue.
/// - `NackDiscard`: the delivery is removed and, when the queue has a dead-letter
///   exchange, forwarded there.
/// - `NackRequeue`: the delivery goes back to the head of its queue and will be
///   redelivered to this or another consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckType {
    Ack,
    NackDiscard,
    NackRequeue,
}

impl fmt::Display for AckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckType::Ack => write!(f, "ack"),
            AckType::NackDiscard => write!(f, "nack-discard"),
            AckType::NackRequeue => write!(f, "nack-requeue"),
        }
    }
}

/// Processes messages of type `T` for a subscription.
///
/// The loop awaits `exec` before pulling the next delivery, so a handler that never
/// returns stalls its own subscription and nothing else.
#[async_trait]
pub trait ConsumerHandler<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn exec(&self, ctx: &Context, msg: T) -> AckType;
}

/// Adapts a plain synchronous closure into a [`ConsumerHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

#[async_trait]
impl<T, F> ConsumerHandler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: Fn(T) -> AckType + Send + Sync,
{
    async fn exec(&self, _ctx: &Context, msg: T) -> AckType {
        (self.0)(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_handler_returns_its_verdict() {
        let handler = handler_fn(|n: u32| {
            if n % 2 == 0 {
                AckType::Ack
            } else {
                AckType::NackRequeue
            }
        });

        assert_eq!(handler.exec(&Context::new(), 2).await, AckType::Ack);
        assert_eq!(handler.exec(&Context::new(), 3).await, AckType::NackRequeue);
    }

    #[test]
    fn displays_verdicts() {
        assert_eq!(AckType::NackDiscard.to_string(), "nack-discard");
    }
}
