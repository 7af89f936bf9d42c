// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! The rule engine deciding move and war outcomes. Its state belongs to the
//! implementation; handlers only read the decisions it returns.

use crate::routing::{ArmyMove, Player, PlayingState, RecognitionOfWar};
#[cfg(test)]
use mockall::automock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move was made by the local player.
    SameActor,
    /// The move resolved without meeting enemy units.
    Safe,
    /// The move put units next to the local player's units.
    MakeWar,
    /// An outcome this protocol version does not recognize.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarOutcome {
    NotInvolved,
    NoUnits,
    OpponentWon,
    YouWon,
    Draw,
    /// An outcome this protocol version does not recognize.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarResolution {
    pub outcome: WarOutcome,
    pub winner: String,
    pub loser: String,
}

impl WarResolution {
    pub fn new(outcome: WarOutcome, winner: &str, loser: &str) -> Self {
        WarResolution {
            outcome,
            winner: winner.to_owned(),
            loser: loser.to_owned(),
        }
    }
}

/// Game rules as seen by the message handlers.
///
/// Implementations are shared between subscription tasks and must synchronize their
/// own state.
#[cfg_attr(test, automock)]
pub trait RuleEngine: Send + Sync {
    fn player(&self) -> Player;

    fn handle_pause(&self, state: &PlayingState);

    fn handle_move(&self, mv: &ArmyMove) -> MoveOutcome;

    fn handle_war(&self, rw: &RecognitionOfWar) -> WarResolution;
}

/// Engine for a participant without an army. It tracks pause broadcasts and stays
/// out of every conflict.
#[derive(Debug)]
pub struct SpectatorEngine {
    player: Player,
    paused: AtomicBool,
}

impl SpectatorEngine {
    pub fn new(username: &str) -> Self {
        SpectatorEngine {
            player: Player::new(username),
            paused: AtomicBool::new(false),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl RuleEngine for SpectatorEngine {
    fn player(&self) -> Player {
        self.player.clone()
    }

    fn handle_pause(&self, state: &PlayingState) {
        self.paused.store(state.is_paused, Ordering::SeqCst);
        info!(
            username = %self.player.username,
            paused = state.is_paused,
            "game pause state changed"
        );
    }

    fn handle_move(&self, mv: &ArmyMove) -> MoveOutcome {
        if mv.player.username == self.player.username {
            MoveOutcome::SameActor
        } else {
            MoveOutcome::Safe
        }
    }

    fn handle_war(&self, rw: &RecognitionOfWar) -> WarResolution {
        let me = &self.player.username;

        if rw.attacker.username != *me && rw.defender.username != *me {
            return WarResolution::new(WarOutcome::NotInvolved, "", "");
        }

        WarResolution::new(WarOutcome::NoUnits, "", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn army_move(username: &str) -> ArmyMove {
        ArmyMove {
            player: Player::new(username),
            units: vec![],
            to_location: "asia".to_owned(),
        }
    }

    #[test]
    fn spectator_follows_pause_broadcasts() {
        let engine = SpectatorEngine::new("carol");
        assert!(!engine.is_paused());

        engine.handle_pause(&PlayingState { is_paused: true });
        assert!(engine.is_paused());

        engine.handle_pause(&PlayingState { is_paused: false });
        assert!(!engine.is_paused());
    }

    #[test]
    fn spectator_never_makes_war() {
        let engine = SpectatorEngine::new("carol");

        assert_eq!(engine.handle_move(&army_move("carol")), MoveOutcome::SameActor);
        assert_eq!(engine.handle_move(&army_move("bob")), MoveOutcome::Safe);
    }

    #[test]
    fn spectator_has_no_units_to_fight_with() {
        let engine = SpectatorEngine::new("carol");

        let others = RecognitionOfWar {
            attacker: Player::new("alice"),
            defender: Player::new("bob"),
        };
        assert_eq!(engine.handle_war(&others).outcome, WarOutcome::NotInvolved);

        let own = RecognitionOfWar {
            attacker: Player::new("alice"),
            defender: Player::new("carol"),
        };
        assert_eq!(engine.handle_war(&own).outcome, WarOutcome::NoUnits);
    }
}
