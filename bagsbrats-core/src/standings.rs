//! Player standings and podium teams
//!
//! Only finalized games count.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cmp::Ordering;

use crate::game::{Game, GameStatus, Side};
use crate::model::UserId;

const UNKNOWN_PLAYER: &str = "Unknown";

/// Standing of a single player
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerStanding {
    pub user_id: UserId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub games_played: u32,
    /// Sum of the player's own team score across games
    pub total_points: i64,
}

/// A fixed pair of partners, ranked for the podium
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TeamStanding {
    pub rank: usize,
    pub player_ids: [UserId; 2],
    pub player_names: Vec<String>,
    pub wins: u32,
    pub games_played: u32,
    pub total_points: i64,
}

fn finalized<'a, I>(games: I) -> impl Iterator<Item = &'a Game>
where
    I: IntoIterator<Item = &'a Game>,
{
    games
        .into_iter()
        .filter(|g| g.status == GameStatus::Finalized)
}

/// Individual leaderboard: wins, then fewer games, then points, then name
pub fn compute_standings<'a, I, F>(games: I, name_of: F) -> Vec<PlayerStanding>
where
    I: IntoIterator<Item = &'a Game>,
    F: Fn(UserId) -> Option<String>,
{
    let mut table: FxHashMap<UserId, PlayerStanding> = FxHashMap::default();

    for game in finalized(games) {
        let winner = game.winner();
        for side in [Side::Team1, Side::Team2] {
            for &pid in game.team(side) {
                let entry = table.entry(pid).or_insert_with(|| PlayerStanding {
                    user_id: pid,
                    name: name_of(pid).unwrap_or_else(|| UNKNOWN_PLAYER.to_string()),
                    wins: 0,
                    losses: 0,
                    games_played: 0,
                    total_points: 0,
                });
                entry.games_played += 1;
                entry.total_points += i64::from(game.score(side));
                match winner {
                    Some(w) if w == side => entry.wins += 1,
                    Some(_) => entry.losses += 1,
                    None => {}
                }
            }
        }
    }

    let mut standings: Vec<PlayerStanding> = table.into_values().collect();
    standings.sort_by(|a, b| rank_order(a, b).then_with(|| a.name.cmp(&b.name)));
    standings
}

fn rank_order(a: &PlayerStanding, b: &PlayerStanding) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then(a.games_played.cmp(&b.games_played))
        .then(b.total_points.cmp(&a.total_points))
}

/// Best `n` partner pairs: wins, then points, then fewer games
pub fn top_teams<'a, I, F>(games: I, name_of: F, n: usize) -> Vec<TeamStanding>
where
    I: IntoIterator<Item = &'a Game>,
    F: Fn(UserId) -> Option<String>,
{
    #[derive(Default)]
    struct Tally {
        wins: u32,
        games_played: u32,
        total_points: i64,
    }

    let mut teams: FxHashMap<[UserId; 2], Tally> = FxHashMap::default();
    for game in finalized(games) {
        let winner = game.winner();
        for side in [Side::Team1, Side::Team2] {
            let [a, b] = match game.team(side) {
                [a, b] => [*a, *b],
                _ => continue,
            };
            let key = if a <= b { [a, b] } else { [b, a] };
            let tally = teams.entry(key).or_default();
            tally.games_played += 1;
            tally.total_points += i64::from(game.score(side));
            if winner == Some(side) {
                tally.wins += 1;
            }
        }
    }

    let mut ranked: Vec<([UserId; 2], Tally)> = teams.into_iter().collect();
    ranked.sort_by(|(ka, a), (kb, b)| {
        b.wins
            .cmp(&a.wins)
            .then(b.total_points.cmp(&a.total_points))
            .then(a.games_played.cmp(&b.games_played))
            .then_with(|| ka.cmp(kb))
    });

    ranked
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (ids, tally))| TeamStanding {
            rank: i + 1,
            player_ids: ids,
            player_names: ids
                .iter()
                .map(|id| name_of(*id).unwrap_or_else(|| UNKNOWN_PLAYER.to_string()))
                .collect(),
            wins: tally.wins,
            games_played: tally.games_played,
            total_points: tally.total_points,
        })
        .collect()
}
