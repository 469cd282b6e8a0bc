//! Pairing generation for a round
//!
//! Players are grouped four to a court. Partners and opponents rotate: the
//! generator samples shuffles and keeps the arrangement that repeats the
//! fewest earlier teammate/opponent pairings, while keeping power players on
//! different teams.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::PairingError;
use crate::game::Game;
use crate::model::UserId;

/// Players needed on one court
pub const PLAYERS_PER_COURT: usize = 4;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone, Debug)]
pub struct PairingConfig {
    /// Shuffles sampled before settling on the best
    pub attempts: usize,
    /// Penalty per earlier time two teammates were partners
    pub teammate_weight: u32,
    /// Penalty per earlier time two opponents faced each other
    pub opponent_weight: u32,
    /// Penalty for two power players on one team
    pub power_team_weight: u32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            attempts: 200,
            teammate_weight: 10,
            opponent_weight: 1,
            power_team_weight: 25,
        }
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// A checked-in player eligible for this round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: UserId,
    /// Games already scheduled for this player in the tournament
    pub games_played: u32,
    pub is_power_player: bool,
}

fn ordered(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// How often pairs of players have shared a team or a court
#[derive(Clone, Debug, Default)]
pub struct PairingHistory {
    teammates: FxHashMap<(UserId, UserId), u32>,
    opponents: FxHashMap<(UserId, UserId), u32>,
}

impl PairingHistory {
    pub fn from_games<'a, I>(games: I) -> Self
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let mut history = Self::default();
        for game in games {
            history.record(&game.team1_player_ids, &game.team2_player_ids);
        }
        history
    }

    pub fn record(&mut self, team1: &[UserId], team2: &[UserId]) {
        for team in [team1, team2] {
            for (i, &a) in team.iter().enumerate() {
                for &b in &team[i + 1..] {
                    *self.teammates.entry(ordered(a, b)).or_insert(0) += 1;
                }
            }
        }
        for &a in team1 {
            for &b in team2 {
                *self.opponents.entry(ordered(a, b)).or_insert(0) += 1;
            }
        }
    }

    pub fn teammate_count(&self, a: UserId, b: UserId) -> u32 {
        self.teammates.get(&ordered(a, b)).copied().unwrap_or(0)
    }

    pub fn opponent_count(&self, a: UserId, b: UserId) -> u32 {
        self.opponents.get(&ordered(a, b)).copied().unwrap_or(0)
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Matchup {
    pub court: u32,
    pub team1: [UserId; 2],
    pub team2: [UserId; 2],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PairingPlan {
    pub matchups: Vec<Matchup>,
    pub sitting_out: Vec<UserId>,
    /// Repeat/power penalty of the chosen arrangement (0 is ideal)
    pub penalty: u32,
}

// ============================================================================
// GENERATION
// ============================================================================

/// Build the courts for one round
pub fn generate_pairings<R: Rng + ?Sized>(
    candidates: &[Candidate],
    history: &PairingHistory,
    config: &PairingConfig,
    rng: &mut R,
) -> Result<PairingPlan, PairingError> {
    if candidates.len() < PLAYERS_PER_COURT {
        return Err(PairingError::NotEnoughPlayers {
            found: candidates.len(),
        });
    }

    let (playing, sitting_out) = choose_sit_outs(candidates, rng);
    let power: FxHashMap<UserId, bool> = candidates
        .iter()
        .map(|c| (c.id, c.is_power_player))
        .collect();
    let is_power = |id: &UserId| power.get(id).copied().unwrap_or(false);

    let mut order: Vec<UserId> = playing;
    let mut best = order.clone();
    let mut best_penalty = u32::MAX;

    for _ in 0..config.attempts.max(1) {
        order.shuffle(rng);
        let penalty = arrangement_penalty(&order, history, config, &is_power);
        if penalty < best_penalty {
            best_penalty = penalty;
            best.clone_from(&order);
            if penalty == 0 {
                break;
            }
        }
    }

    let matchups = best
        .chunks_exact(PLAYERS_PER_COURT)
        .enumerate()
        .map(|(i, court)| Matchup {
            court: i as u32 + 1,
            team1: [court[0], court[1]],
            team2: [court[2], court[3]],
        })
        .collect();

    Ok(PairingPlan {
        matchups,
        sitting_out,
        penalty: best_penalty,
    })
}

/// Split off `n % 4` players, preferring those with the most games so far
fn choose_sit_outs<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> (Vec<UserId>, Vec<UserId>) {
    let mut pool: Vec<&Candidate> = candidates.iter().collect();
    pool.shuffle(rng);
    // stable sort keeps the random order among equals
    pool.sort_by(|a, b| b.games_played.cmp(&a.games_played));

    let extra = pool.len() % PLAYERS_PER_COURT;
    let sitting_out = pool[..extra].iter().map(|c| c.id).collect();
    let playing = pool[extra..].iter().map(|c| c.id).collect();
    (playing, sitting_out)
}

fn arrangement_penalty(
    order: &[UserId],
    history: &PairingHistory,
    config: &PairingConfig,
    is_power: &impl Fn(&UserId) -> bool,
) -> u32 {
    let mut penalty = 0;
    for court in order.chunks_exact(PLAYERS_PER_COURT) {
        let (team1, team2) = court.split_at(2);
        for team in [team1, team2] {
            penalty += config.teammate_weight * history.teammate_count(team[0], team[1]);
            if is_power(&team[0]) && is_power(&team[1]) {
                penalty += config.power_team_weight;
            }
        }
        for &a in team1 {
            for &b in team2 {
                penalty += config.opponent_weight * history.opponent_count(a, b);
            }
        }
    }
    penalty
}
