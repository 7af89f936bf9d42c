// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use opentelemetry::Context;
use peril_pubsub::{
    channel::{new_amqp_channel, new_amqp_connection},
    configs::RabbitMQConfigs,
    game::{bootstrap_game_topology, logs::FileLogSink, publish_pause, subscribe_logs},
    publisher::RabbitMQPublisher,
    routing::PlayingState,
};
use std::{error::Error, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = RabbitMQConfigs::load()?;
    let conn = new_amqp_connection(&cfg).await?;
    info!(host = %cfg.host, port = cfg.port, "peril server connected");

    bootstrap_game_topology(&conn).await?;

    let logs = subscribe_logs(&conn, Arc::new(FileLogSink::default())).await?;

    let publisher = RabbitMQPublisher::new(new_amqp_channel(&conn).await?);
    if let Err(err) = publish_pause(
        publisher.as_ref(),
        &Context::current(),
        &PlayingState { is_paused: true },
    )
    .await
    {
        error!(error = err.to_string(), "could not publish pause");
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
        _ = logs => error!("log subscription ended"),
    }

    conn.close(200, "server shutting down").await?;

    Ok(())
}
