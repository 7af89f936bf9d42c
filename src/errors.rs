// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the Peril Pub/Sub Layer
//!
//! Errors are split by the phase in which they happen. Setup-time failures
//! (`ConnectionError`, `TopologyError`, `SubscribeError`) are fatal and returned to
//! the caller. Steady-state failures (`CodecError` while decoding, `AckError`) are
//! contained to a single delivery and only logged by the subscription loop.
//! `PublishError` is recoverable: the caller decides whether to retry.

use thiserror::Error;

/// Errors raised while loading configuration or establishing the broker connection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConnectionError {
    /// The configuration sources could not be read or deserialized
    #[error("failure to load configs `{0}`")]
    ConfigsError(String),

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect `{0}`")]
    ConnectError(String),
}

/// Errors raised while declaring or binding broker-side topology.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// Error creating a channel from an established connection
    #[error("failure to create a channel `{0}`")]
    ChannelError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue, including a conflicting redeclaration
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to binding exchange `{0}` to queue `{1}`")]
    BindingExchangeToQueueError(String, String),
}

/// Errors raised by a [`crate::codec::Codec`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("failure to encode payload `{0}`")]
    Encode(String),

    #[error("failure to parse payload `{0}`")]
    Decode(String),
}

/// Errors raised while publishing a message.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PublishError {
    /// The value could not be encoded; nothing was sent
    #[error(transparent)]
    EncodeError(#[from] CodecError),

    /// The channel rejected the message or is no longer usable
    #[error("failure to publish `{0}`")]
    TransportError(String),
}

/// Errors raised while starting a subscription. No loop runs after any of these.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubscribeError {
    /// The subscription options contradict each other
    #[error("invalid subscription options `{0}`")]
    InvalidOptions(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Error configuring Quality of Service parameters
    #[error("failure to configure qos `{0}`")]
    QoSDeclarationError(String),

    /// Error declaring a consumer
    #[error("failure to declare consumer `{0}`")]
    ConsumerDeclarationError(String),
}

/// Errors raised by acknowledgment calls. Logged by the loop, never fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AckError {
    #[error("failure to ack message `{0}`")]
    AckMessageError(String),

    #[error("failure to nack message `{0}`")]
    NackMessageError(String),

    #[error("failure to requeuing message `{0}`")]
    RequeuingMessageError(String),
}
