//! Countdown helpers
//!
//! Clients render the clock from the server-set `end_time`; everything here is
//! derived from that deadline and an explicit `now`.

use chrono::{DateTime, Utc};

use crate::game::Game;

/// Whole seconds until `end_time`, never negative
pub fn remaining_seconds(end_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (end_time - now).num_seconds().max(0)
}

/// Active games whose clock has run out
pub fn expired_games<'a, I>(games: I, now: DateTime<Utc>) -> Vec<&'a Game>
where
    I: IntoIterator<Item = &'a Game>,
{
    games.into_iter().filter(|g| g.is_expired(now)).collect()
}
