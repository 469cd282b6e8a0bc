//! JSON shapes returned to clients

use chrono::{DateTime, Utc};
use serde::Serialize;

use bagsbrats_core::{Game, Role, User, UserId};

use crate::state::Database;

/// A user without credentials
#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_proxy: bool,
    pub is_power_player: bool,
    pub has_paid: bool,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub has_password: bool,
    pub google_linked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            is_proxy: user.is_proxy,
            is_power_player: user.is_power_player,
            has_paid: user.has_paid,
            checked_in: user.checked_in,
            checked_in_at: user.checked_in_at,
            has_password: user.password_hash.is_some(),
            google_linked: user.google_id.is_some(),
            created_at: user.created_at,
        }
    }
}

/// Login payload user summary
#[derive(Clone, Debug, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub is_proxy: bool,
    pub checked_in: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
            is_proxy: user.is_proxy,
            checked_in: user.checked_in,
        }
    }
}

/// A game with player names and its live countdown
#[derive(Clone, Debug, Serialize)]
pub struct GameView {
    #[serde(flatten)]
    pub game: Game,
    pub team1_player_names: Vec<String>,
    pub team2_player_names: Vec<String>,
    pub remaining_seconds: Option<i64>,
}

impl GameView {
    pub fn new(db: &Database, game: &Game, now: DateTime<Utc>) -> Self {
        let names = |ids: &[UserId]| {
            ids.iter()
                .map(|id| db.name_of(*id).unwrap_or_else(|| "Unknown".to_string()))
                .collect()
        };
        Self {
            team1_player_names: names(&game.team1_player_ids),
            team2_player_names: names(&game.team2_player_ids),
            remaining_seconds: game.remaining_seconds(now),
            game: game.clone(),
        }
    }
}

/// Views for a set of games, ordered by day, round, then court
pub fn game_views<'a, I>(db: &Database, games: I, now: DateTime<Utc>) -> Vec<GameView>
where
    I: IntoIterator<Item = &'a Game>,
{
    let mut games: Vec<&Game> = games.into_iter().collect();
    games.sort_by_key(|g| (g.day_index, g.round_number, g.court));
    games.into_iter().map(|g| GameView::new(db, g, now)).collect()
}
