// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Peril Game Protocol
//!
//! Wires the game's message kinds onto the pub/sub layer:
//!
//! | message            | exchange       | queue                   | lifetime  | codec   |
//! |--------------------|----------------|-------------------------|-----------|---------|
//! | `PlayingState`     | `peril_direct` | `pause.<username>`      | transient | json    |
//! | `ArmyMove`         | `peril_topic`  | `army_moves.<username>` | transient | json    |
//! | `RecognitionOfWar` | `peril_topic`  | `war`                   | durable   | json    |
//! | `GameLog`          | `peril_topic`  | `game_logs`             | durable   | bincode |

pub mod engine;
pub mod handlers;
pub mod logs;

use self::{
    engine::RuleEngine,
    handlers::{LogHandler, MoveHandler, PauseHandler, WarHandler},
    logs::LogSink,
};
use crate::{
    channel::{new_amqp_channel, ChannelGuard},
    codec::{BincodeCodec, JsonCodec},
    errors::{PublishError, SubscribeError, TopologyError},
    exchange::ExchangeDefinition,
    publisher::{publish, Publisher},
    queue::{QueueBinding, QueueDefinition, QueueLifetime},
    routing::{
        scoped, wildcard, ArmyMove, GameLog, PlayingState, RecognitionOfWar, ARMY_MOVES_PREFIX,
        EXCHANGE_PERIL_DIRECT, EXCHANGE_PERIL_DLX, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG,
        PAUSE_KEY, QUEUE_PERIL_DLQ, WAR_RECOGNITIONS_PREFIX,
    },
    subscriber::subscribe,
    topology::{AmqpTopology, Topology},
};
use lapin::{Channel, Connection};
use opentelemetry::Context;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Declares the game exchanges and the dead-letter queue. Safe to run on every start.
pub async fn install_game_topology(channel: Arc<Channel>) -> Result<(), TopologyError> {
    AmqpTopology::new(channel)
        .exchange(ExchangeDefinition::new(EXCHANGE_PERIL_DIRECT).direct().durable())
        .exchange(ExchangeDefinition::new(EXCHANGE_PERIL_TOPIC).topic().durable())
        .exchange(ExchangeDefinition::new(EXCHANGE_PERIL_DLX).fanout().durable())
        .queue(QueueDefinition::new(QUEUE_PERIL_DLQ).durable())
        .queue_binding(QueueBinding::new(QUEUE_PERIL_DLQ).exchange(EXCHANGE_PERIL_DLX))
        .install()
        .await?;

    Ok(())
}

/// Installs the game topology on a short-lived channel of `conn`, which is closed
/// before returning.
pub async fn bootstrap_game_topology(conn: &Connection) -> Result<(), TopologyError> {
    install_and_release(new_amqp_channel(conn).await?).await
}

pub(crate) async fn install_and_release(channel: Arc<Channel>) -> Result<(), TopologyError> {
    let _guard = ChannelGuard::new(channel.clone());

    install_game_topology(channel.clone()).await?;

    channel
        .close(200, "topology installed")
        .await
        .map_err(|err| TopologyError::ChannelError(err.to_string()))
}

/// Broadcasts the server's pause state to every player on the direct exchange.
pub async fn publish_pause(
    publisher: &dyn Publisher,
    ctx: &Context,
    state: &PlayingState,
) -> Result<(), PublishError> {
    publish(publisher, ctx, EXCHANGE_PERIL_DIRECT, PAUSE_KEY, state, &JsonCodec).await
}

/// Publishes a move made by `mv.player` on that player's move key.
pub async fn publish_move(
    publisher: &dyn Publisher,
    ctx: &Context,
    mv: &ArmyMove,
) -> Result<(), PublishError> {
    let key = scoped(ARMY_MOVES_PREFIX, &mv.player.username);
    publish(publisher, ctx, EXCHANGE_PERIL_TOPIC, &key, mv, &JsonCodec).await
}

/// Publishes a war declaration observed by `username`.
pub async fn publish_war(
    publisher: &dyn Publisher,
    ctx: &Context,
    username: &str,
    rw: &RecognitionOfWar,
) -> Result<(), PublishError> {
    let key = scoped(WAR_RECOGNITIONS_PREFIX, username);
    publish(publisher, ctx, EXCHANGE_PERIL_TOPIC, &key, rw, &JsonCodec).await
}

/// Publishes a game log entry, bincode encoded, on `game_logs.<username>`.
pub async fn publish_game_log(
    publisher: &dyn Publisher,
    ctx: &Context,
    entry: &GameLog,
) -> Result<(), PublishError> {
    let key = scoped(GAME_LOG_SLUG, &entry.username);
    publish(publisher, ctx, EXCHANGE_PERIL_TOPIC, &key, entry, &BincodeCodec).await
}

/// Subscribes the local player to pause broadcasts.
///
/// # Parameters
/// * `conn` - Shared broker connection
/// * `engine` - Rule engine of the local player; its username scopes the queue
///
/// # Returns
/// The loop task consuming the transient `pause.<username>` queue
pub async fn subscribe_pause(
    conn: &Connection,
    engine: Arc<dyn RuleEngine>,
) -> Result<JoinHandle<()>, SubscribeError> {
    let username = engine.player().username;

    subscribe::<PlayingState, _, _>(
        conn,
        EXCHANGE_PERIL_DIRECT,
        &scoped(PAUSE_KEY, &username),
        PAUSE_KEY,
        QueueLifetime::Transient,
        JsonCodec,
        PauseHandler::new(engine),
    )
    .await
}

/// Subscribes the local player to every player's moves.
///
/// # Parameters
/// * `conn` - Shared broker connection
/// * `engine` - Rule engine of the local player
/// * `publisher` - Used to declare war when a move meets the local player's units
///
/// # Returns
/// The loop task consuming the transient `army_moves.<username>` queue
pub async fn subscribe_moves(
    conn: &Connection,
    engine: Arc<dyn RuleEngine>,
    publisher: Arc<dyn Publisher>,
) -> Result<JoinHandle<()>, SubscribeError> {
    let username = engine.player().username;

    subscribe::<ArmyMove, _, _>(
        conn,
        EXCHANGE_PERIL_TOPIC,
        &scoped(ARMY_MOVES_PREFIX, &username),
        &wildcard(ARMY_MOVES_PREFIX),
        QueueLifetime::Transient,
        JsonCodec,
        MoveHandler::new(engine, publisher),
    )
    .await
}

/// Joins the shared, durable `war` queue. Declarations the local player is not part
/// of are requeued for the other participants.
///
/// # Parameters
/// * `conn` - Shared broker connection
/// * `engine` - Rule engine resolving the war
/// * `publisher` - Used to publish the resulting game log
///
/// # Returns
/// The loop task consuming the `war` queue
pub async fn subscribe_war(
    conn: &Connection,
    engine: Arc<dyn RuleEngine>,
    publisher: Arc<dyn Publisher>,
) -> Result<JoinHandle<()>, SubscribeError> {
    subscribe::<RecognitionOfWar, _, _>(
        conn,
        EXCHANGE_PERIL_TOPIC,
        WAR_RECOGNITIONS_PREFIX,
        &wildcard(WAR_RECOGNITIONS_PREFIX),
        QueueLifetime::Durable,
        JsonCodec,
        WarHandler::new(engine, publisher),
    )
    .await
}

/// Consumes the shared, durable `game_logs` queue into `sink`.
///
/// # Returns
/// The loop task consuming the `game_logs` queue
pub async fn subscribe_logs(
    conn: &Connection,
    sink: Arc<dyn LogSink>,
) -> Result<JoinHandle<()>, SubscribeError> {
    subscribe::<GameLog, _, _>(
        conn,
        EXCHANGE_PERIL_TOPIC,
        GAME_LOG_SLUG,
        &wildcard(GAME_LOG_SLUG),
        QueueLifetime::Durable,
        BincodeCodec,
        LogHandler::new(sink),
    )
    .await
}
