// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connection and Channel Management
//!
//! One connection is shared by the whole process. Every publisher and every
//! subscription loop opens its own channel on it, so a failure on one channel
//! never reaches another.

use crate::{
    configs::RabbitMQConfigs,
    errors::{ConnectionError, TopologyError},
};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Establishes the shared AMQP connection described by `cfg`.
///
/// The connection is named after `cfg.app_name` so it can be identified in the
/// broker's management UI.
pub async fn new_amqp_connection(cfg: &RabbitMQConfigs) -> Result<Arc<Connection>, ConnectionError> {
    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app_name.clone()));

    match Connection::connect(&cfg.uri(), options).await {
        Ok(conn) => {
            debug!("amqp connected");
            Ok(Arc::new(conn))
        }
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(ConnectionError::ConnectError(err.to_string()))
        }
    }
}

/// Opens a new channel on the shared connection.
pub async fn new_amqp_channel(conn: &Connection) -> Result<Arc<Channel>, TopologyError> {
    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!(channel = c.id(), "channel created");
            Ok(Arc::new(c))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(TopologyError::ChannelError(err.to_string()))
        }
    }
}

/// Closes the wrapped channel when dropped.
///
/// Held by a subscription task for its whole lifetime, so the channel is released
/// whether the loop ends because the stream closed or because the task unwound.
pub(crate) struct ChannelGuard {
    channel: Option<Arc<Channel>>,
}

impl ChannelGuard {
    pub(crate) fn new(channel: Arc<Channel>) -> Self {
        ChannelGuard {
            channel: Some(channel),
        }
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        let Some(channel) = self.channel.take() else {
            return;
        };

        if !channel.status().connected() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = channel.close(200, "subscription finished").await {
                        warn!(error = err.to_string(), "failure to close channel");
                    } else {
                        debug!(channel = channel.id(), "channel closed");
                    }
                });
            }
            Err(_) => warn!(
                channel = channel.id(),
                "no runtime available, leaving channel to the connection"
            ),
        }
    }
}
