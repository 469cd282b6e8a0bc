//! Round control: pairings, start, stop and the dashboard summary

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::round::{self, next_pending_round, summarize_day, RoundSummary};
use bagsbrats_core::{
    pairing, Candidate, Game, GameId, GameStatus, PairingHistory, Tournament, TournamentError,
    TournamentId,
};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::events::ServerEvent;
use crate::state::{Database, ServerState};
use crate::views::{game_views, GameView};

/// Open tournament, the requested day (default: current) and that day's rounds
fn day_context(
    db: &Database,
    day_index: Option<usize>,
) -> ApiResult<(Tournament, usize, Vec<RoundSummary>)> {
    let tournament = db.require_open_tournament()?.clone();
    let day_index = day_index.unwrap_or(tournament.current_day_index);
    tournament.ensure_day(day_index)?;
    let rounds = summarize_day(
        db.tournament_games(tournament.id),
        day_index,
        tournament.rounds_per_day,
    );
    Ok((tournament, day_index, rounds))
}

fn activate(db: &mut Database, tournament_id: TournamentId) {
    if let Some(tournament) = db.tournaments.get_mut(&tournament_id) {
        if tournament.activate() {
            tracing::info!(%tournament_id, "tournament is now active");
        }
    }
}

// ============================================================================
// PAIRINGS
// ============================================================================

#[derive(Default, Deserialize)]
pub struct PairingRequest {
    pub round_number: Option<u32>,
    pub day_index: Option<usize>,
}

struct PairingOutcome {
    tournament_id: TournamentId,
    day_index: usize,
    round_number: u32,
    pairings: Vec<GameView>,
    sitting_out: Vec<Value>,
}

/// Pair every checked-in player into courts for the next round
pub async fn generate_pairings(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    body: Option<Json<PairingRequest>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let now = Utc::now();
    let mut rng = state.pairing_rng().await;

    let outcome = state
        .store
        .mutate(|db| {
            let (tournament, day_index, rounds) = day_context(db, req.day_index)?;
            let round_number = match req.round_number {
                Some(round) => round,
                None => next_pending_round(&rounds).ok_or(TournamentError::NoPendingRound)?,
            };
            round::ensure_can_pair(&rounds, round_number)?;

            let candidates: Vec<Candidate> = db
                .users
                .values()
                .filter(|u| u.checked_in)
                .map(|u| Candidate {
                    id: u.id,
                    games_played: db
                        .tournament_games(tournament.id)
                        .filter(|g| g.involves(u.id))
                        .count() as u32,
                    is_power_player: u.is_power_player,
                })
                .collect();
            let history = PairingHistory::from_games(db.tournament_games(tournament.id));
            let plan = pairing::generate_pairings(&candidates, &history, &state.pairing, &mut *rng)?;

            let mut created: Vec<GameId> = Vec::with_capacity(plan.matchups.len());
            for matchup in &plan.matchups {
                let game = Game::new(
                    tournament.id,
                    day_index,
                    round_number,
                    matchup.court,
                    matchup.team1,
                    matchup.team2,
                    now,
                );
                created.push(game.id);
                db.games.insert(game.id, game);
            }

            let pairings = game_views(db, created.iter().filter_map(|id| db.games.get(id)), now);
            let sitting_out = plan
                .sitting_out
                .iter()
                .map(|id| json!({ "id": id, "name": db.name_of(*id) }))
                .collect();
            Ok(PairingOutcome {
                tournament_id: tournament.id,
                day_index,
                round_number,
                pairings,
                sitting_out,
            })
        })
        .await?;
    drop(rng);

    tracing::info!(
        round = outcome.round_number,
        day = outcome.day_index,
        courts = outcome.pairings.len(),
        sitting_out = outcome.sitting_out.len(),
        "pairings generated"
    );
    state
        .events
        .publish(
            outcome.tournament_id,
            ServerEvent::PairingsRevealed(outcome.pairings.clone()),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "msg": format!("Pairings generated for round {}", outcome.round_number),
            "round_number": outcome.round_number,
            "day_index": outcome.day_index,
            "pairings": outcome.pairings,
            "sitting_out": outcome.sitting_out,
        })),
    ))
}

// ============================================================================
// ROUND STATUS
// ============================================================================

#[derive(Deserialize)]
pub struct DayQuery {
    pub day_index: Option<usize>,
}

pub async fn round_status(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Query(query): Query<DayQuery>,
) -> ApiResult<Json<Value>> {
    let db = state.store.read().await;
    let (tournament, day_index, rounds) = day_context(&db, query.day_index)?;
    Ok(Json(json!({
        "day_index": day_index,
        "day_number": day_index + 1,
        "date": tournament.date_for_day(day_index),
        "rounds_per_day": tournament.rounds_per_day,
        "rounds": rounds,
    })))
}

// ============================================================================
// START / STOP
// ============================================================================

#[derive(Deserialize)]
pub struct RoundRequest {
    pub round_number: u32,
    pub day_index: Option<usize>,
}

pub async fn start_round(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Json(req): Json<RoundRequest>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (tournament_id, day_index, end_time, started) = state
        .store
        .mutate(|db| {
            let (tournament, day_index, rounds) = day_context(db, req.day_index)?;
            round::ensure_can_start(&rounds, req.round_number)?;

            let mut games = db.round_games_mut(tournament.id, day_index, req.round_number);
            let end_time = round::start_round(&mut games, now, tournament.game_minutes)?;
            let started = games.len();
            activate(db, tournament.id);
            Ok((tournament.id, day_index, end_time, started))
        })
        .await?;

    tracing::info!(round = req.round_number, day = day_index, games = started, %end_time, "round started");
    state
        .events
        .publish(
            tournament_id,
            ServerEvent::RoundStarted {
                day_index,
                round_number: req.round_number,
                end_time,
            },
        )
        .await;
    Ok(Json(json!({
        "msg": format!("Round {} started", req.round_number),
        "end_time": end_time,
        "games_started": started,
    })))
}

pub async fn stop_round(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Json(req): Json<RoundRequest>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (tournament_id, day_index, finalized) = state
        .store
        .mutate(|db| {
            let (tournament, day_index, rounds) = day_context(db, req.day_index)?;
            round::ensure_can_stop(&rounds, req.round_number)?;

            let mut games = db.round_games_mut(tournament.id, day_index, req.round_number);
            let finalized = round::stop_round(&mut games, now)?;
            Ok((tournament.id, day_index, finalized))
        })
        .await?;

    tracing::info!(round = req.round_number, day = day_index, finalized, "round stopped");
    state
        .events
        .publish(
            tournament_id,
            ServerEvent::RoundStopped {
                day_index,
                round_number: req.round_number,
                finalized,
            },
        )
        .await;
    state
        .events
        .publish(tournament_id, ServerEvent::StandingsUpdated {})
        .await;
    Ok(Json(json!({
        "msg": format!("Round {} stopped", req.round_number),
        "finalized": finalized,
    })))
}

/// Start every upcoming game of the current day against one deadline
pub async fn start_all(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (tournament_id, end_time, started): (TournamentId, DateTime<Utc>, Vec<GameId>) = state
        .store
        .mutate(|db| {
            let tournament = db.require_open_tournament()?.clone();
            let mut games: Vec<&mut Game> = db
                .games
                .values_mut()
                .filter(|g| {
                    g.tournament_id == tournament.id
                        && g.day_index == tournament.current_day_index
                        && g.status == GameStatus::Upcoming
                })
                .collect();
            if games.is_empty() {
                return Err(ApiError::bad_request("No upcoming games to start"));
            }
            let end_time = round::start_round(&mut games, now, tournament.game_minutes)?;
            let started = games.iter().map(|g| g.id).collect();
            activate(db, tournament.id);
            Ok((tournament.id, end_time, started))
        })
        .await?;

    tracing::info!(games = started.len(), %end_time, "all upcoming games started");
    for &game_id in &started {
        state
            .events
            .publish(tournament_id, ServerEvent::GameStarted { game_id, end_time })
            .await;
    }
    state
        .events
        .publish(tournament_id, ServerEvent::StandingsUpdated {})
        .await;
    Ok(Json(json!({
        "msg": format!("Started {} games", started.len()),
        "games_started": started.len(),
        "end_time": end_time,
    })))
}
