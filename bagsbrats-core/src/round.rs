//! Rounds: aggregation of the games played at the same time on one day
//!
//! A round has no record of its own. Its status is derived from its games:
//!
//! | games                          | status     |
//! |--------------------------------|------------|
//! | none                           | `pending`  |
//! | all upcoming                   | `ready`    |
//! | all finalized                  | `complete` |
//! | anything else                  | `active`   |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TournamentError;
use crate::game::{Game, GameStatus};
use crate::model::MAX_ROUNDS_PER_DAY;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Ready,
    Active,
    Complete,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Pending => f.write_str("pending"),
            RoundStatus::Ready => f.write_str("ready"),
            RoundStatus::Active => f.write_str("active"),
            RoundStatus::Complete => f.write_str("complete"),
        }
    }
}

impl RoundStatus {
    pub fn derive<'a, I>(games: I) -> Self
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let mut any = false;
        let mut all_upcoming = true;
        let mut all_finalized = true;
        for game in games {
            any = true;
            all_upcoming &= game.status == GameStatus::Upcoming;
            all_finalized &= game.status == GameStatus::Finalized;
        }
        match (any, all_upcoming, all_finalized) {
            (false, _, _) => RoundStatus::Pending,
            (true, true, _) => RoundStatus::Ready,
            (true, _, true) => RoundStatus::Complete,
            _ => RoundStatus::Active,
        }
    }
}

/// Round card shown on the admin dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundSummary {
    pub round_number: u32,
    pub status: RoundStatus,
    pub total_games: usize,
    pub upcoming_games: usize,
    pub active_games: usize,
    pub finalized_games: usize,
    /// Latest deadline among the round's active games
    pub end_time: Option<DateTime<Utc>>,
}

impl RoundSummary {
    pub fn from_games<'a, I>(round_number: u32, games: I) -> Self
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let games: Vec<&Game> = games.into_iter().collect();
        let count = |status: GameStatus| games.iter().filter(|g| g.status == status).count();
        let end_time = games
            .iter()
            .filter(|g| g.status == GameStatus::Active)
            .filter_map(|g| g.end_time)
            .max();

        Self {
            round_number,
            status: RoundStatus::derive(games.iter().copied()),
            total_games: games.len(),
            upcoming_games: count(GameStatus::Upcoming),
            active_games: count(GameStatus::Active),
            finalized_games: count(GameStatus::Finalized),
            end_time,
        }
    }
}

// ============================================================================
// DAY VIEW
// ============================================================================

/// Summaries for rounds `1..=rounds_per_day` of one day, capped at `MAX_ROUNDS_PER_DAY`
pub fn summarize_day<'a, I>(games: I, day_index: usize, rounds_per_day: u32) -> Vec<RoundSummary>
where
    I: IntoIterator<Item = &'a Game>,
{
    let day_games: Vec<&Game> = games
        .into_iter()
        .filter(|g| g.day_index == day_index)
        .collect();

    (1..=rounds_per_day.min(MAX_ROUNDS_PER_DAY))
        .map(|round| {
            RoundSummary::from_games(
                round,
                day_games.iter().copied().filter(|g| g.round_number == round),
            )
        })
        .collect()
}

pub fn next_pending_round(summaries: &[RoundSummary]) -> Option<u32> {
    summaries
        .iter()
        .find(|s| s.status == RoundStatus::Pending)
        .map(|s| s.round_number)
}

fn summary_for(summaries: &[RoundSummary], round: u32) -> Result<&RoundSummary, TournamentError> {
    summaries
        .iter()
        .find(|s| s.round_number == round)
        .ok_or(TournamentError::RoundOutOfRange {
            round,
            rounds_per_day: summaries.len() as u32,
        })
}

/// Pairings go to a pending round whose predecessors are already paired
pub fn ensure_can_pair(summaries: &[RoundSummary], round: u32) -> Result<(), TournamentError> {
    let summary = summary_for(summaries, round)?;
    if summary.status != RoundStatus::Pending {
        return Err(TournamentError::RoundAlreadyPaired {
            round,
            status: summary.status,
        });
    }
    if let Some(earlier) = summaries
        .iter()
        .find(|s| s.round_number < round && s.status == RoundStatus::Pending)
    {
        return Err(TournamentError::EarlierRoundUnpaired {
            round,
            earlier: earlier.round_number,
        });
    }
    Ok(())
}

/// A round starts from `ready` while no other round of the day is running
pub fn ensure_can_start(summaries: &[RoundSummary], round: u32) -> Result<(), TournamentError> {
    let summary = summary_for(summaries, round)?;
    if summary.status != RoundStatus::Ready {
        return Err(TournamentError::RoundState {
            round,
            status: summary.status,
            expected: RoundStatus::Ready,
        });
    }
    ensure_none_active(summaries)
}

pub fn ensure_can_stop(summaries: &[RoundSummary], round: u32) -> Result<(), TournamentError> {
    let summary = summary_for(summaries, round)?;
    if summary.status != RoundStatus::Active {
        return Err(TournamentError::RoundState {
            round,
            status: summary.status,
            expected: RoundStatus::Active,
        });
    }
    Ok(())
}

pub fn ensure_none_active(summaries: &[RoundSummary]) -> Result<(), TournamentError> {
    match summaries.iter().find(|s| s.status == RoundStatus::Active) {
        Some(active) => Err(TournamentError::AnotherRoundActive {
            active: active.round_number,
        }),
        None => Ok(()),
    }
}

// ============================================================================
// TRANSITIONS
// ============================================================================

/// Start every game of a ready round against one shared deadline
pub fn start_round(
    games: &mut [&mut Game],
    now: DateTime<Utc>,
    minutes: i64,
) -> Result<DateTime<Utc>, TournamentError> {
    let end_time = crate::game::deadline(now, minutes)?;
    for game in games.iter_mut() {
        game.start_until(now, end_time)?;
    }
    Ok(end_time)
}

/// Finalize every unfinished game with its current score
pub fn stop_round(games: &mut [&mut Game], now: DateTime<Utc>) -> Result<usize, TournamentError> {
    let mut finalized = 0;
    for game in games.iter_mut() {
        if game.status == GameStatus::Finalized {
            continue;
        }
        let (s1, s2) = (game.score1, game.score2);
        game.finalize(s1, s2, None, now)?;
        finalized += 1;
    }
    Ok(finalized)
}
