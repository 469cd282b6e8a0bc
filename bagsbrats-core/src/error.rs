//! Domain errors

use crate::game::GameStatus;
use crate::reveal::PodiumPlace;
use crate::round::RoundStatus;

/// Errors raised by the tournament state machines
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TournamentError {
    #[error("Game already finalized")]
    GameAlreadyFinalized,

    #[error("Cannot move game from {from} to {to}")]
    InvalidTransition { from: GameStatus, to: GameStatus },

    #[error("Game length must be between 1 and 1440 minutes, got {minutes}")]
    GameLengthOutOfRange { minutes: i64 },

    #[error("Scores must not be negative")]
    NegativeScore,

    #[error("Round {round} must be between 1 and {rounds_per_day}")]
    RoundOutOfRange { round: u32, rounds_per_day: u32 },

    #[error("Round {round} already has pairings ({status})")]
    RoundAlreadyPaired { round: u32, status: RoundStatus },

    #[error("Round {earlier} needs pairings before round {round}")]
    EarlierRoundUnpaired { round: u32, earlier: u32 },

    #[error("Round {round} is {status}, expected {expected}")]
    RoundState {
        round: u32,
        status: RoundStatus,
        expected: RoundStatus,
    },

    #[error("Round {active} is still active")]
    AnotherRoundActive { active: u32 },

    #[error("Every round of the day already has pairings")]
    NoPendingRound,

    #[error("Day {day_index} is not part of this tournament")]
    DayOutOfRange { day_index: usize },

    #[error("Already on the final tournament day")]
    FinalDay,

    #[error("Tournament is complete")]
    TournamentComplete,

    #[error("Reveal {expected} before {requested}")]
    RevealOutOfOrder {
        requested: PodiumPlace,
        expected: PodiumPlace,
    },
}

/// Errors raised while building a pairing plan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("Not enough players checked in (min 4, found {found})")]
    NotEnoughPlayers { found: usize },
}
