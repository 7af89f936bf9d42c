// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Handlers for each game message kind and the acknowledgment policy they apply.

use super::{
    engine::{MoveOutcome, RuleEngine, WarOutcome, WarResolution},
    logs::LogSink,
    publish_game_log, publish_war,
};
use crate::{
    handler::{AckType, ConsumerHandler},
    publisher::Publisher,
    routing::{ArmyMove, GameLog, PlayingState, RecognitionOfWar},
};
use async_trait::async_trait;
use chrono::Utc;
use opentelemetry::Context;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Applies pause broadcasts. State broadcasts are idempotent, so every one is acked.
pub struct PauseHandler {
    engine: Arc<dyn RuleEngine>,
}

impl PauseHandler {
    pub fn new(engine: Arc<dyn RuleEngine>) -> Arc<Self> {
        Arc::new(PauseHandler { engine })
    }
}

#[async_trait]
impl ConsumerHandler<PlayingState> for PauseHandler {
    async fn exec(&self, _ctx: &Context, msg: PlayingState) -> AckType {
        self.engine.handle_pause(&msg);
        AckType::Ack
    }
}

/// Resolves moves made by other players.
///
/// A move that starts a war is requeued after the war declaration is published, so
/// the war is settled through redelivery of the move.
pub struct MoveHandler {
    engine: Arc<dyn RuleEngine>,
    publisher: Arc<dyn Publisher>,
}

impl MoveHandler {
    pub fn new(engine: Arc<dyn RuleEngine>, publisher: Arc<dyn Publisher>) -> Arc<Self> {
        Arc::new(MoveHandler { engine, publisher })
    }
}

#[async_trait]
impl ConsumerHandler<ArmyMove> for MoveHandler {
    async fn exec(&self, ctx: &Context, msg: ArmyMove) -> AckType {
        match self.engine.handle_move(&msg) {
            MoveOutcome::SameActor | MoveOutcome::Safe => AckType::Ack,
            MoveOutcome::MakeWar => {
                let defender = self.engine.player();
                let declaration = RecognitionOfWar {
                    attacker: msg.player,
                    defender,
                };

                if let Err(err) = publish_war(
                    self.publisher.as_ref(),
                    ctx,
                    &declaration.defender.username,
                    &declaration,
                )
                .await
                {
                    error!(error = err.to_string(), "error publishing war declaration");
                }

                AckType::NackRequeue
            }
            MoveOutcome::Unknown => {
                error!(player = %msg.player.username, "unknown move outcome, discarding");
                AckType::NackDiscard
            }
        }
    }
}

/// Resolves war declarations seen on the shared war queue.
pub struct WarHandler {
    engine: Arc<dyn RuleEngine>,
    publisher: Arc<dyn Publisher>,
}

impl WarHandler {
    pub fn new(engine: Arc<dyn RuleEngine>, publisher: Arc<dyn Publisher>) -> Arc<Self> {
        Arc::new(WarHandler { engine, publisher })
    }

    async fn record(&self, ctx: &Context, message: String) {
        let username = self.engine.player().username;
        let entry = GameLog {
            current_time: Utc::now(),
            message,
            username,
        };

        if let Err(err) = publish_game_log(self.publisher.as_ref(), ctx, &entry).await {
            warn!(error = err.to_string(), "error publishing war log");
        }
    }
}

pub(crate) fn war_log_message(resolution: &WarResolution) -> Option<String> {
    match resolution.outcome {
        WarOutcome::OpponentWon | WarOutcome::YouWon => Some(format!(
            "{} won a war against {}",
            resolution.winner, resolution.loser
        )),
        WarOutcome::Draw => Some(format!(
            "A war between {} and {} resulted in a draw",
            resolution.winner, resolution.loser
        )),
        WarOutcome::NotInvolved | WarOutcome::NoUnits | WarOutcome::Unknown => None,
    }
}

#[async_trait]
impl ConsumerHandler<RecognitionOfWar> for WarHandler {
    async fn exec(&self, ctx: &Context, msg: RecognitionOfWar) -> AckType {
        let resolution = self.engine.handle_war(&msg);

        match resolution.outcome {
            WarOutcome::NotInvolved => AckType::NackRequeue,
            WarOutcome::NoUnits => AckType::NackDiscard,
            WarOutcome::OpponentWon | WarOutcome::YouWon | WarOutcome::Draw => {
                if let Some(message) = war_log_message(&resolution) {
                    info!(%message, "war resolved");
                    self.record(ctx, message).await;
                }
                AckType::Ack
            }
            WarOutcome::Unknown => {
                error!(
                    attacker = %msg.attacker.username,
                    defender = %msg.defender.username,
                    "unknown war outcome, discarding"
                );
                AckType::NackDiscard
            }
        }
    }
}

/// Persists game logs. A failed write is requeued for another attempt.
pub struct LogHandler {
    sink: Arc<dyn LogSink>,
}

impl LogHandler {
    pub fn new(sink: Arc<dyn LogSink>) -> Arc<Self> {
        Arc::new(LogHandler { sink })
    }
}

#[async_trait]
impl ConsumerHandler<GameLog> for LogHandler {
    async fn exec(&self, _ctx: &Context, msg: GameLog) -> AckType {
        match self.sink.write_log(&msg).await {
            Ok(()) => AckType::Ack,
            Err(err) => {
                error!(error = err.to_string(), "error writing log");
                AckType::NackRequeue
            }
        }
    }
}
