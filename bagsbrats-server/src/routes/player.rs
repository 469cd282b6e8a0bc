//! Player self-service: check-in and "my game"

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::{CheckInDecision, GameStatus};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;
use crate::views::GameView;

pub async fn check_in(
    State(state): State<Arc<ServerState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let checked_in_at = state
        .store
        .mutate(|db| {
            if let CheckInDecision::Closed(reason) = state.check_in.evaluate(db.open_tournament(), now) {
                return Err(ApiError::BadRequest(reason));
            }
            let user = db.user_mut(user_id)?;
            user.set_checked_in(true, now);
            Ok(user.checked_in_at)
        })
        .await?;

    tracing::info!(%user_id, "player checked in");
    Ok(Json(json!({
        "msg": "Checked in successfully",
        "checked_in_at": checked_in_at,
    })))
}

/// The caller's running game, else their next one, else `null`
pub async fn current_game(
    State(state): State<Arc<ServerState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Option<GameView>>> {
    let db = state.store.read().await;
    let Some(tournament) = db.open_tournament() else {
        return Ok(Json(None));
    };

    let game = db
        .tournament_games(tournament.id)
        .filter(|g| g.involves(user_id) && g.status != GameStatus::Finalized)
        .min_by_key(|g| {
            (
                g.status != GameStatus::Active,
                g.day_index,
                g.round_number,
                g.court,
            )
        });
    Ok(Json(game.map(|g| GameView::new(&db, g, Utc::now()))))
}
