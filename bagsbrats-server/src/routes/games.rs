//! Game listing, score submission and admin overrides

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::{GameId, GameStatus};

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::events::ServerEvent;
use crate::state::ServerState;
use crate::views::{game_views, GameView};

/// All games of the open tournament
pub async fn active_games(State(state): State<Arc<ServerState>>) -> Json<Vec<GameView>> {
    let db = state.store.read().await;
    let Some(tournament) = db.open_tournament() else {
        return Json(Vec::new());
    };
    Json(game_views(&db, db.tournament_games(tournament.id), Utc::now()))
}

pub async fn admin_games(
    state: State<Arc<ServerState>>,
    _admin: AdminUser,
) -> Json<Vec<GameView>> {
    active_games(state).await
}

#[derive(Deserialize)]
pub struct ScoreRequest {
    pub score1: i32,
    pub score2: i32,
}

/// Final score from a participant or an admin. Accepted once per game.
pub async fn submit_score(
    State(state): State<Arc<ServerState>>,
    AuthUser(user_id): AuthUser,
    Path(game_id): Path<GameId>,
    Json(req): Json<ScoreRequest>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let view = state
        .store
        .mutate(|db| {
            let is_admin = db.user(user_id)?.is_admin();
            let game = db.game_mut(game_id)?;
            if !is_admin && !game.involves(user_id) {
                return Err(ApiError::Forbidden(
                    "Only players in this game can submit scores".to_string(),
                ));
            }
            game.finalize(req.score1, req.score2, Some(user_id), now)?;
            Ok(GameView::new(db, db.game(game_id)?, now))
        })
        .await?;

    tracing::info!(%game_id, score1 = req.score1, score2 = req.score2, "score submitted");
    state
        .events
        .publish(view.game.tournament_id, ServerEvent::StandingsUpdated {})
        .await;
    Ok(Json(json!({ "msg": "Score submitted", "game": view })))
}

/// Start a single game's countdown
pub async fn start_game(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Path(game_id): Path<GameId>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (tournament_id, end_time) = state
        .store
        .mutate(|db| {
            let tournament_id = db.game(game_id)?.tournament_id;
            let tournament = db
                .tournaments
                .get_mut(&tournament_id)
                .ok_or(ApiError::NotFound("Tournament"))?;
            let minutes = tournament.game_minutes;
            let game = db.games.get_mut(&game_id).ok_or(ApiError::NotFound("Game"))?;
            let end_time = game.start(now, minutes)?;
            if tournament.activate() {
                tracing::info!(%tournament_id, "tournament is now active");
            }
            Ok((tournament_id, end_time))
        })
        .await?;

    tracing::info!(%game_id, %end_time, "game started");
    state
        .events
        .publish(tournament_id, ServerEvent::GameStarted { game_id, end_time })
        .await;
    state
        .events
        .publish(tournament_id, ServerEvent::StandingsUpdated {})
        .await;
    Ok(Json(json!({ "msg": "Game started", "end_time": end_time })))
}

#[derive(Deserialize)]
pub struct UpdateGameRequest {
    pub score1: Option<i32>,
    pub score2: Option<i32>,
    pub status: Option<GameStatus>,
}

/// Admin edit: enter or correct scores, or move the game forward
pub async fn update_game(
    State(state): State<Arc<ServerState>>,
    AdminUser(admin): AdminUser,
    Path(game_id): Path<GameId>,
    Json(req): Json<UpdateGameRequest>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (view, started) = state
        .store
        .mutate(|db| {
            let original = db.game(game_id)?;
            let minutes = db
                .tournaments
                .get(&original.tournament_id)
                .map(|t| t.game_minutes)
                .ok_or(ApiError::NotFound("Tournament"))?;

            let original_status = original.status;
            // edits apply to a copy so a rejected change leaves the game untouched
            let mut game = original.clone();
            let scores = (req.score1.is_some() || req.score2.is_some()).then(|| {
                (
                    req.score1.unwrap_or(game.score1),
                    req.score2.unwrap_or(game.score2),
                )
            });
            match (scores, req.status) {
                (None, None) => return Err(ApiError::bad_request("Nothing to update")),
                (Some((s1, s2)), None) if game.status == GameStatus::Finalized => {
                    game.correct_scores(s1, s2)?;
                }
                (Some((s1, s2)), None) => {
                    game.finalize(s1, s2, Some(admin.id), now)?;
                }
                (scores, Some(target)) => {
                    if let Some((s1, s2)) = scores {
                        game.correct_scores(s1, s2)?;
                    }
                    game.apply_status(target, now, minutes)?;
                }
            }

            let started = original_status == GameStatus::Upcoming && game.status == GameStatus::Active;
            if started {
                if let Some(tournament) = db.tournaments.get_mut(&game.tournament_id) {
                    tournament.activate();
                }
            }
            let view = GameView::new(db, &game, now);
            db.games.insert(game_id, game);
            Ok((view, started))
        })
        .await?;

    tracing::info!(%game_id, status = %view.game.status, "game updated by admin");
    let tournament_id = view.game.tournament_id;
    if let (true, Some(end_time)) = (started, view.game.end_time) {
        state
            .events
            .publish(tournament_id, ServerEvent::GameStarted { game_id, end_time })
            .await;
    }
    state
        .events
        .publish(tournament_id, ServerEvent::StandingsUpdated {})
        .await;
    Ok(Json(json!({ "msg": "Game updated", "game": view })))
}
