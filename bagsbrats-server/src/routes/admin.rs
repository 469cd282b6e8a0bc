//! Admin roster management and tournament controls

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::round::{ensure_none_active, summarize_day};
use bagsbrats_core::{Role, TournamentStatus, User, UserId};

use crate::accounts;
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::events::ServerEvent;
use crate::state::ServerState;
use crate::views::UserView;
use super::non_empty;

// ============================================================================
// ROSTER
// ============================================================================

#[derive(Deserialize)]
pub struct ProxyRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Register a player who has no phone or account of their own
pub async fn proxy_register(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Json(req): Json<ProxyRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = non_empty(req.name).ok_or_else(|| ApiError::bad_request("Name is required"))?;
    let email = non_empty(req.email).map(|e| e.to_lowercase());

    let user_id = state
        .store
        .mutate(|db| {
            if email.as_deref().is_some_and(|e| db.user_by_email(e).is_some()) {
                return Err(ApiError::Conflict("Email already registered".to_string()));
            }
            let mut user = User::new(name, Utc::now());
            user.email = email;
            user.phone = non_empty(req.phone);
            user.is_proxy = true;
            let id = user.id;
            db.users.insert(id, user);
            Ok(id)
        })
        .await?;

    tracing::info!(%user_id, "proxy player registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "Proxy player registered", "user_id": user_id })),
    ))
}

pub async fn list_users(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> Json<Vec<UserView>> {
    let db = state.store.read().await;
    let mut users: Vec<UserView> = db.users.values().map(UserView::from).collect();
    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Json(users)
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub is_power_player: Option<bool>,
    pub has_paid: Option<bool>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

pub async fn update_user(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Path(user_id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserView>> {
    let view = state
        .store
        .mutate(|db| {
            let user = db.user_mut(user_id)?;
            if let Some(power) = req.is_power_player {
                user.is_power_player = power;
            }
            if let Some(paid) = req.has_paid {
                user.has_paid = paid;
            }
            if let Some(name) = non_empty(req.name) {
                user.name = name;
            }
            if let Some(phone) = req.phone {
                user.phone = non_empty(Some(phone));
            }
            Ok(UserView::from(&*user))
        })
        .await?;
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn update_role(
    State(state): State<Arc<ServerState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<UserId>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<UserView>> {
    if user_id == admin.id && req.role != Role::Admin {
        return Err(ApiError::bad_request("Cannot remove your own admin role"));
    }
    let view = state
        .store
        .mutate(|db| {
            let user = db.user_mut(user_id)?;
            user.role = req.role;
            Ok(UserView::from(&*user))
        })
        .await?;
    tracing::info!(%user_id, role = %req.role, "role changed");
    Ok(Json(view))
}

pub async fn delete_user(
    State(state): State<Arc<ServerState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<Value>> {
    if user_id == admin.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }
    state
        .store
        .mutate(|db| {
            db.users
                .remove(&user_id)
                .map(|_| ())
                .ok_or(ApiError::NotFound("User"))
        })
        .await?;
    tracing::info!(%user_id, "user deleted");
    Ok(Json(json!({ "msg": "User deleted" })))
}

/// Remove every account except the caller's
pub async fn delete_all_players(
    State(state): State<Arc<ServerState>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let deleted = state
        .store
        .mutate(|db| {
            let before = db.users.len();
            db.users.retain(|id, _| *id == admin.id);
            Ok(before - db.users.len())
        })
        .await?;
    tracing::warn!(deleted, "bulk-deleted users");
    Ok(Json(json!({ "msg": format!("Deleted {} users", deleted), "deleted": deleted })))
}

/// Add the 24-player sample roster
pub async fn seed_users(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let missing = {
        let db = state.store.read().await;
        accounts::missing_seed_players(&db)
    };
    let passwords = state.passwords.clone();
    let users = tokio::task::spawn_blocking(move || {
        accounts::build_seed_users(&missing, &passwords, Utc::now())
    })
    .await
    .map_err(ApiError::internal)??;
    let created = state
        .store
        .mutate(|db| Ok(accounts::insert_seed_users(db, users)))
        .await?;

    tracing::info!(created, "seeded sample players");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": format!("Seeded {} players", created), "created": created })),
    ))
}

#[derive(Deserialize)]
pub struct CheckInRequest {
    pub checked_in: bool,
}

/// Check a player in or out regardless of the window
pub async fn set_check_in(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Path(user_id): Path<UserId>,
    Json(req): Json<CheckInRequest>,
) -> ApiResult<Json<UserView>> {
    let view = state
        .store
        .mutate(|db| {
            let user = db.user_mut(user_id)?;
            user.set_checked_in(req.checked_in, Utc::now());
            Ok(UserView::from(&*user))
        })
        .await?;
    Ok(Json(view))
}

// ============================================================================
// TOURNAMENT CONTROLS
// ============================================================================

#[derive(Deserialize)]
pub struct BlackoutRequest {
    pub blackout: bool,
}

pub async fn set_blackout(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Json(req): Json<BlackoutRequest>,
) -> ApiResult<Json<Value>> {
    let (tournament_id, status) = state
        .store
        .mutate(|db| {
            let tournament = db.open_tournament_mut()?;
            tournament.set_blackout(req.blackout)?;
            Ok((tournament.id, tournament.status))
        })
        .await?;

    tracing::info!(blackout = req.blackout, "blackout changed");
    state
        .events
        .publish(
            tournament_id,
            ServerEvent::BlackoutStatus {
                is_blackout: req.blackout,
            },
        )
        .await;
    Ok(Json(json!({
        "msg": if req.blackout { "Blackout enabled" } else { "Blackout disabled" },
        "status": status,
    })))
}

#[derive(Deserialize)]
pub struct CheckInOpenRequest {
    pub open: bool,
}

/// Manual override of the check-in window
pub async fn set_check_in_open(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
    Json(req): Json<CheckInOpenRequest>,
) -> ApiResult<Json<Value>> {
    let tournament_id = state
        .store
        .mutate(|db| {
            let tournament = db.open_tournament_mut()?;
            tournament.check_in_open = req.open;
            Ok(tournament.id)
        })
        .await?;

    tracing::info!(open = req.open, "check-in override changed");
    state
        .events
        .publish(tournament_id, ServerEvent::CheckInStatus { open: req.open })
        .await;
    Ok(Json(json!({
        "msg": if req.open { "Check-in opened" } else { "Check-in closed" },
        "check_in_open": req.open,
    })))
}

pub async fn next_day(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Value>> {
    let day_index = state
        .store
        .mutate(|db| {
            let tournament = db.require_open_tournament()?;
            let rounds = summarize_day(
                db.tournament_games(tournament.id),
                tournament.current_day_index,
                tournament.rounds_per_day,
            );
            ensure_none_active(&rounds)?;
            Ok(db.open_tournament_mut()?.advance_day()?)
        })
        .await?;

    tracing::info!(day = day_index, "advanced to next tournament day");
    Ok(Json(json!({
        "msg": format!("Advanced to day {}", day_index + 1),
        "current_day_index": day_index,
    })))
}

pub async fn complete_tournament(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Value>> {
    let tournament_id = state
        .store
        .mutate(|db| {
            let tournament = db.open_tournament_mut()?;
            tournament.complete();
            Ok(tournament.id)
        })
        .await?;

    tracing::info!(%tournament_id, "tournament complete");
    Ok(Json(json!({
        "msg": "Tournament completed",
        "status": TournamentStatus::Complete,
    })))
}

/// Remove every tournament and game
pub async fn delete_all_tournaments(
    State(state): State<Arc<ServerState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Value>> {
    let (tournaments, games) = state
        .store
        .mutate(|db| {
            let counts = (db.tournaments.len(), db.games.len());
            db.tournaments.clear();
            db.games.clear();
            Ok(counts)
        })
        .await?;

    tracing::warn!(tournaments, games, "bulk-deleted tournaments");
    Ok(Json(json!({
        "msg": format!("Deleted {} tournaments and {} games", tournaments, games),
        "deleted_tournaments": tournaments,
        "deleted_games": games,
    })))
}
