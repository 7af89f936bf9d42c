// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use peril_pubsub::{
    channel::new_amqp_connection,
    configs::{PlayerConfigs, RabbitMQConfigs},
    game::{engine::SpectatorEngine, subscribe_pause},
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
    let player = PlayerConfigs::load()?;
    let conn = new_amqp_connection(&cfg).await?;
    info!(host = %cfg.host, port = cfg.port, username = %player.username, "peril client connected");

    let engine = Arc::new(SpectatorEngine::new(&player.username));
    let pause = subscribe_pause(&conn, engine).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
        _ = pause => error!("pause subscription ended"),
    }

    conn.close(200, "client shutting down").await?;

    Ok(())
}
