//! Podium: top teams and the third-second-first reveal

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::{top_teams as rank_teams, PodiumPlace, TeamStanding, Tournament};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::events::ServerEvent;
use crate::state::{Database, ServerState};

const PODIUM_SIZE: usize = 3;

fn podium(db: &Database, tournament: &Tournament) -> Vec<TeamStanding> {
    rank_teams(
        db.tournament_games(tournament.id),
        |id| db.name_of(id),
        PODIUM_SIZE,
    )
}

fn team_for(podium: &[TeamStanding], place: PodiumPlace) -> Option<TeamStanding> {
    podium.get(place.rank() - 1).cloned()
}

pub async fn top_teams(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<TeamStanding>>> {
    let db = state.store.read().await;
    let tournament = db
        .current_tournament()
        .ok_or(ApiError::NotFound("Tournament"))?;
    Ok(Json(podium(&db, tournament)))
}

#[derive(Serialize)]
pub struct RevealedPlace {
    pub place: PodiumPlace,
    pub team: Option<TeamStanding>,
}

/// Places revealed so far, in ceremony order
pub async fn revealed(State(state): State<Arc<ServerState>>) -> Json<Vec<RevealedPlace>> {
    let db = state.store.read().await;
    let Some(tournament) = db.current_tournament() else {
        return Json(Vec::new());
    };
    let podium = podium(&db, tournament);
    Json(
        tournament
            .reveal
            .revealed()
            .iter()
            .map(|&place| RevealedPlace {
                place,
                team: team_for(&podium, place),
            })
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct RevealRequest {
    pub place: PodiumPlace,
}

pub async fn reveal_place(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Json(req): Json<RevealRequest>,
) -> ApiResult<Json<Value>> {
    let (tournament_id, newly, team) = state
        .store
        .mutate(|db| {
            let tournament = db
                .current_tournament()
                .ok_or(ApiError::NotFound("Tournament"))?;
            let (id, team) = (tournament.id, team_for(&podium(db, tournament), req.place));
            let tournament = db
                .tournaments
                .get_mut(&id)
                .ok_or(ApiError::NotFound("Tournament"))?;
            let newly = tournament.reveal.reveal(req.place)?;
            Ok((id, newly, team))
        })
        .await?;

    if newly {
        tracing::info!(place = %req.place, "podium place revealed");
        state
            .events
            .publish(
                tournament_id,
                ServerEvent::PodiumRevealed {
                    place: req.place,
                    team: team.clone(),
                },
            )
            .await;
    }
    Ok(Json(json!({
        "msg": format!("Revealed {} place", req.place),
        "place": req.place,
        "team": team,
    })))
}
