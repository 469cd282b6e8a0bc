//! Games and their lifecycle
//!
//! A game moves `upcoming -> active -> finalized`. Finalization happens
//! exactly once; later submissions are rejected and only an admin score
//! correction can touch the result afterwards.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::TournamentError;
use crate::model::{GameId, TournamentId, UserId, MAX_GAME_MINUTES};
use crate::timer;

/// `now + minutes`, rejecting lengths outside `1..=MAX_GAME_MINUTES`
pub fn deadline(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>, TournamentError> {
    if !(1..=MAX_GAME_MINUTES).contains(&minutes) {
        return Err(TournamentError::GameLengthOutOfRange { minutes });
    }
    Duration::try_minutes(minutes)
        .and_then(|length| now.checked_add_signed(length))
        .ok_or(TournamentError::GameLengthOutOfRange { minutes })
}

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Upcoming,
    Active,
    Finalized,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Upcoming => f.write_str("upcoming"),
            GameStatus::Active => f.write_str("active"),
            GameStatus::Finalized => f.write_str("finalized"),
        }
    }
}

/// One side of a court
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Team1,
    Team2,
}

/// A two-vs-two game on one court within a round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(rename = "_id")]
    pub id: GameId,
    pub tournament_id: TournamentId,
    pub day_index: usize,
    pub round_number: u32,
    pub court: u32,
    pub team1_player_ids: Vec<UserId>,
    pub team2_player_ids: Vec<UserId>,
    #[serde(default)]
    pub score1: i32,
    #[serde(default)]
    pub score2: i32,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Countdown deadline set when the game starts
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn new(
        tournament_id: TournamentId,
        day_index: usize,
        round_number: u32,
        court: u32,
        team1: [UserId; 2],
        team2: [UserId; 2],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            day_index,
            round_number,
            court,
            team1_player_ids: team1.to_vec(),
            team2_player_ids: team2.to_vec(),
            score1: 0,
            score2: 0,
            status: GameStatus::Upcoming,
            start_time: None,
            end_time: None,
            finished_at: None,
            submitted_by: None,
            created_at: now,
        }
    }

    pub fn is_in_round(&self, day_index: usize, round_number: u32) -> bool {
        self.day_index == day_index && self.round_number == round_number
    }

    pub fn team(&self, side: Side) -> &[UserId] {
        match side {
            Side::Team1 => &self.team1_player_ids,
            Side::Team2 => &self.team2_player_ids,
        }
    }

    pub fn score(&self, side: Side) -> i32 {
        match side {
            Side::Team1 => self.score1,
            Side::Team2 => self.score2,
        }
    }

    pub fn team_of(&self, user: UserId) -> Option<Side> {
        if self.team1_player_ids.contains(&user) {
            Some(Side::Team1)
        } else if self.team2_player_ids.contains(&user) {
            Some(Side::Team2)
        } else {
            None
        }
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.team_of(user).is_some()
    }

    pub fn players(&self) -> impl Iterator<Item = UserId> + '_ {
        self.team1_player_ids
            .iter()
            .chain(self.team2_player_ids.iter())
            .copied()
    }

    /// Winning side of a finalized game; `None` for ties and unfinished games
    pub fn winner(&self) -> Option<Side> {
        if self.status != GameStatus::Finalized {
            return None;
        }
        match self.score1.cmp(&self.score2) {
            std::cmp::Ordering::Greater => Some(Side::Team1),
            std::cmp::Ordering::Less => Some(Side::Team2),
            std::cmp::Ordering::Equal => None,
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start the countdown: `upcoming -> active`
    pub fn start(&mut self, now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>, TournamentError> {
        let end_time = deadline(now, minutes)?;
        self.start_until(now, end_time)?;
        Ok(end_time)
    }

    /// Start with an explicit deadline, used when a round shares one end time
    pub fn start_until(&mut self, now: DateTime<Utc>, end_time: DateTime<Utc>) -> Result<(), TournamentError> {
        if self.status != GameStatus::Upcoming {
            return Err(TournamentError::InvalidTransition {
                from: self.status,
                to: GameStatus::Active,
            });
        }
        self.status = GameStatus::Active;
        self.start_time = Some(now);
        self.end_time = Some(end_time);
        Ok(())
    }

    /// Record the final score. Succeeds once per game.
    pub fn finalize(
        &mut self,
        score1: i32,
        score2: i32,
        submitted_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<(), TournamentError> {
        if self.status == GameStatus::Finalized {
            return Err(TournamentError::GameAlreadyFinalized);
        }
        check_scores(score1, score2)?;
        self.score1 = score1;
        self.score2 = score2;
        self.status = GameStatus::Finalized;
        self.submitted_by = submitted_by;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Admin score edit; leaves the status alone
    pub fn correct_scores(&mut self, score1: i32, score2: i32) -> Result<(), TournamentError> {
        check_scores(score1, score2)?;
        self.score1 = score1;
        self.score2 = score2;
        Ok(())
    }

    /// Admin status override limited to forward transitions.
    ///
    /// Returns false when the game already had the requested status.
    pub fn apply_status(
        &mut self,
        target: GameStatus,
        now: DateTime<Utc>,
        minutes: i64,
    ) -> Result<bool, TournamentError> {
        if target == self.status {
            return Ok(false);
        }
        match target {
            GameStatus::Active => {
                self.start(now, minutes)?;
            }
            GameStatus::Finalized => {
                let (s1, s2) = (self.score1, self.score2);
                self.finalize(s1, s2, None, now)?;
            }
            GameStatus::Upcoming => {
                return Err(TournamentError::InvalidTransition {
                    from: self.status,
                    to: target,
                })
            }
        }
        Ok(true)
    }

    // ========================================================================
    // COUNTDOWN
    // ========================================================================

    /// Seconds left on the clock, only for active games
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        match (self.status, self.end_time) {
            (GameStatus::Active, Some(end)) => Some(timer::remaining_seconds(end, now)),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == Some(0)
    }
}

fn check_scores(score1: i32, score2: i32) -> Result<(), TournamentError> {
    if score1 < 0 || score2 < 0 {
        Err(TournamentError::NegativeScore)
    } else {
        Ok(())
    }
}
