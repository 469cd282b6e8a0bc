//! Tournament creation, lookup and standings

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::model::{MAX_GAME_MINUTES, MAX_ROUNDS_PER_DAY};
use bagsbrats_core::{compute_standings, PlayerStanding, TimeInfo, Tournament};

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;

pub async fn active_tournament(State(state): State<Arc<ServerState>>) -> Json<Option<Tournament>> {
    let db = state.store.read().await;
    Json(db.open_tournament().cloned())
}

#[derive(Deserialize)]
pub struct CreateTournamentRequest {
    pub name: Option<String>,
    pub dates: Option<Vec<String>>,
    #[serde(default)]
    pub start_times: Vec<String>,
    pub rounds_per_day: Option<u32>,
    pub game_minutes: Option<i64>,
}

pub async fn create_tournament(
    State(state): State<Arc<ServerState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateTournamentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let dates = req.dates.filter(|d| !d.is_empty());
    let (Some(name), Some(dates)) = (name, dates) else {
        return Err(ApiError::bad_request("Name and dates are required"));
    };

    let mut parsed = dates
        .iter()
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| ApiError::bad_request(format!("Invalid date: {}", d)))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    parsed.sort();
    parsed.dedup();

    let mut tournament = Tournament::new(name, parsed, Utc::now());
    tournament.start_times = req.start_times;
    tournament.rounds_per_day = state.config.rounds_per_day;
    tournament.game_minutes = state.config.game_minutes;
    if let Some(rounds) = req.rounds_per_day {
        if !(1..=MAX_ROUNDS_PER_DAY).contains(&rounds) {
            return Err(ApiError::bad_request(format!(
                "rounds_per_day must be between 1 and {}",
                MAX_ROUNDS_PER_DAY
            )));
        }
        tournament.rounds_per_day = rounds;
    }
    if let Some(minutes) = req.game_minutes {
        if !(1..=MAX_GAME_MINUTES).contains(&minutes) {
            return Err(ApiError::bad_request(format!(
                "game_minutes must be between 1 and {}",
                MAX_GAME_MINUTES
            )));
        }
        tournament.game_minutes = minutes;
    }

    let created = state
        .store
        .mutate(|db| {
            if db.open_tournament().is_some() {
                return Err(ApiError::Conflict(
                    "An active tournament already exists".to_string(),
                ));
            }
            db.tournaments.insert(tournament.id, tournament.clone());
            Ok(tournament)
        })
        .await?;

    tracing::info!(tournament_id = %created.id, admin = %admin.id, "tournament created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "Tournament created", "tournament": created })),
    ))
}

/// Leaderboard of the current tournament. Hidden from players during blackout.
pub async fn standings(
    State(state): State<Arc<ServerState>>,
    caller: Option<AuthUser>,
) -> Json<Vec<PlayerStanding>> {
    let db = state.store.read().await;
    let Some(tournament) = db.current_tournament() else {
        return Json(Vec::new());
    };

    if tournament.is_blackout() {
        let is_admin = caller
            .and_then(|AuthUser(id)| db.users.get(&id))
            .is_some_and(|u| u.is_admin());
        if !is_admin {
            return Json(Vec::new());
        }
    }

    Json(compute_standings(db.tournament_games(tournament.id), |id| {
        db.name_of(id)
    }))
}

pub async fn time_info(State(state): State<Arc<ServerState>>) -> Json<TimeInfo> {
    Json(state.check_in.time_info(Utc::now()))
}
