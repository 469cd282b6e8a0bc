//! Bags & Brats Core - Tournament domain
//!
//! This crate holds the pure tournament logic, free of HTTP and storage:
//! - Users, tournaments and games
//! - Game lifecycle (upcoming -> active -> finalized) and countdowns
//! - Round aggregation (pending -> ready -> active -> complete)
//! - Pairing generation with partner rotation
//! - Standings and the podium reveal
//! - Check-in window in tournament-local time

pub mod checkin;
pub mod error;
pub mod game;
pub mod model;
pub mod pairing;
pub mod reveal;
pub mod roster;
pub mod round;
pub mod standings;
pub mod timer;

// Re-exports for convenient access
pub use checkin::{CheckInDecision, CheckInWindow, TimeInfo};
pub use error::{PairingError, TournamentError};
pub use game::{Game, GameStatus, Side};
pub use model::{GameId, Role, Tournament, TournamentId, TournamentStatus, User, UserId};
pub use pairing::{generate_pairings, Candidate, Matchup, PairingConfig, PairingHistory, PairingPlan};
pub use reveal::{PodiumPlace, RevealState};
pub use round::{RoundStatus, RoundSummary};
pub use standings::{compute_standings, top_teams, PlayerStanding, TeamStanding};
