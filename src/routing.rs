// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Routing Conventions and Payloads
//!
//! Exchange names, routing keys, and the message types exchanged by the game server
//! and its clients. These strings must be identical on every participant for the
//! bindings to match. Payload fields use `PascalCase` names on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direct exchange carrying server broadcasts
pub const EXCHANGE_PERIL_DIRECT: &str = "peril_direct";
/// Topic exchange carrying moves, war declarations and logs
pub const EXCHANGE_PERIL_TOPIC: &str = "peril_topic";
/// Fanout exchange receiving rejected and expired messages
pub const EXCHANGE_PERIL_DLX: &str = "peril_dlx";
/// Queue collecting everything routed through the dead-letter exchange
pub const QUEUE_PERIL_DLQ: &str = "peril_dlq";

pub const PAUSE_KEY: &str = "pause";
pub const ARMY_MOVES_PREFIX: &str = "army_moves";
pub const WAR_RECOGNITIONS_PREFIX: &str = "war";
pub const GAME_LOG_SLUG: &str = "game_logs";

/// Builds `<prefix>.<suffix>`, the form shared by per-player routing keys and queue names.
pub fn scoped(prefix: &str, suffix: &str) -> String {
    format!("{prefix}.{suffix}")
}

/// Builds the topic binding key matching every `<prefix>.<word>` routing key.
pub fn wildcard(prefix: &str) -> String {
    format!("{prefix}.*")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayingState {
    pub is_paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitRank {
    Infantry,
    Cavalry,
    Artillery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Unit {
    #[serde(rename = "ID")]
    pub id: u32,
    pub rank: UnitRank,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Player {
    pub username: String,
    pub units: HashMap<u32, Unit>,
}

impl Player {
    pub fn new(username: &str) -> Self {
        Player {
            username: username.to_owned(),
            units: HashMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArmyMove {
    pub player: Player,
    pub units: Vec<Unit>,
    pub to_location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecognitionOfWar {
    pub attacker: Player,
    pub defender: Player,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameLog {
    pub current_time: DateTime<Utc>,
    pub message: String,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_scoped_names_and_wildcards() {
        assert_eq!(scoped(PAUSE_KEY, "alice"), "pause.alice");
        assert_eq!(scoped(ARMY_MOVES_PREFIX, "bob"), "army_moves.bob");
        assert_eq!(wildcard(WAR_RECOGNITIONS_PREFIX), "war.*");
        assert_eq!(wildcard(GAME_LOG_SLUG), "game_logs.*");
    }

    #[test]
    fn decodes_pause_broadcast_from_wire() {
        let state: PlayingState = serde_json::from_str(r#"{"IsPaused":true}"#).unwrap();
        assert!(state.is_paused);
    }
}
