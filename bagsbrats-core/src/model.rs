//! Persistent records: users and tournaments
//!
//! Games live in [`crate::game`] next to their state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::TournamentError;
use crate::reveal::RevealState;

pub type UserId = Uuid;
pub type TournamentId = Uuid;
pub type GameId = Uuid;

/// Default number of rounds played on each tournament day
pub const DEFAULT_ROUNDS_PER_DAY: u32 = 3;

/// Default game length in minutes
pub const DEFAULT_GAME_MINUTES: i64 = 20;

pub const MAX_ROUNDS_PER_DAY: u32 = 50;

/// One day
pub const MAX_GAME_MINUTES: i64 = 24 * 60;

// ============================================================================
// USERS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Player,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Player => f.write_str("player"),
        }
    }
}

/// A registered player, proxy player or admin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Created by an admin for someone without a device
    #[serde(default)]
    pub is_proxy: bool,
    #[serde(default)]
    pub is_power_player: bool,
    #[serde(default)]
    pub has_paid: bool,
    #[serde(default)]
    pub checked_in: bool,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            phone: None,
            password_hash: None,
            google_id: None,
            role: Role::Player,
            is_proxy: false,
            is_power_player: false,
            has_paid: false,
            checked_in: false,
            checked_in_at: None,
            created_at: now,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Set or clear check-in, stamping the time when checking in
    pub fn set_checked_in(&mut self, checked_in: bool, now: DateTime<Utc>) {
        self.checked_in = checked_in;
        self.checked_in_at = checked_in.then_some(now);
    }

    /// Clear the per-day flags (check-in and payment)
    pub fn reset_daily_status(&mut self) {
        self.checked_in = false;
        self.checked_in_at = None;
        self.has_paid = false;
    }
}

// ============================================================================
// TOURNAMENTS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    #[default]
    Upcoming,
    Active,
    /// Standings hidden ahead of the reveal
    Blackout,
    Complete,
}

/// A multi-day tournament
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    #[serde(rename = "_id")]
    pub id: TournamentId,
    pub name: String,
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub start_times: Vec<String>,
    #[serde(default)]
    pub status: TournamentStatus,
    #[serde(default)]
    pub current_day_index: usize,
    pub rounds_per_day: u32,
    pub game_minutes: i64,
    /// Manual check-in override set by an admin
    #[serde(default)]
    pub check_in_open: bool,
    #[serde(default)]
    pub reveal: RevealState,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            dates,
            start_times: Vec::new(),
            status: TournamentStatus::Upcoming,
            current_day_index: 0,
            rounds_per_day: DEFAULT_ROUNDS_PER_DAY,
            game_minutes: DEFAULT_GAME_MINUTES,
            check_in_open: false,
            reveal: RevealState::default(),
            created_at: now,
        }
    }

    /// Whether this tournament still accepts play (anything but complete)
    pub fn is_open(&self) -> bool {
        self.status != TournamentStatus::Complete
    }

    pub fn is_blackout(&self) -> bool {
        self.status == TournamentStatus::Blackout
    }

    /// Move an upcoming tournament to active. Returns true on change.
    pub fn activate(&mut self) -> bool {
        if self.status == TournamentStatus::Upcoming {
            self.status = TournamentStatus::Active;
            true
        } else {
            false
        }
    }

    pub fn set_blackout(&mut self, blackout: bool) -> Result<(), TournamentError> {
        if !self.is_open() {
            return Err(TournamentError::TournamentComplete);
        }
        if blackout {
            self.status = TournamentStatus::Blackout;
        } else if self.status == TournamentStatus::Blackout {
            self.status = TournamentStatus::Active;
        }
        Ok(())
    }

    pub fn advance_day(&mut self) -> Result<usize, TournamentError> {
        if !self.is_open() {
            return Err(TournamentError::TournamentComplete);
        }
        if self.current_day_index + 1 >= self.dates.len() {
            return Err(TournamentError::FinalDay);
        }
        self.current_day_index += 1;
        self.check_in_open = false;
        Ok(self.current_day_index)
    }

    pub fn complete(&mut self) {
        self.status = TournamentStatus::Complete;
        self.check_in_open = false;
    }

    pub fn date_for_day(&self, day_index: usize) -> Option<NaiveDate> {
        self.dates.get(day_index).copied()
    }

    pub fn ensure_day(&self, day_index: usize) -> Result<(), TournamentError> {
        if day_index < self.dates.len() {
            Ok(())
        } else {
            Err(TournamentError::DayOutOfRange { day_index })
        }
    }

    pub fn is_tournament_day(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}
