//! Registration, login, profile and Google sign-in

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use bagsbrats_core::User;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::oauth::{link_google_user, GoogleOAuth};
use crate::state::ServerState;
use crate::views::{SessionUser, UserView};
use super::non_empty;

fn google(state: &ServerState) -> ApiResult<&GoogleOAuth> {
    state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Google OAuth is not configured".to_string()))
}

// ============================================================================
// PASSWORD ACCOUNTS
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

pub async fn register(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (Some(email), Some(password)) = (non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Email and password are required"));
    };
    let email = email.to_lowercase();
    let hash = state.passwords.hash_blocking(password).await?;

    let user_id = state
        .store
        .mutate(|db| {
            if db.user_by_email(&email).is_some() {
                return Err(ApiError::Conflict("Email already registered".to_string()));
            }
            let name = non_empty(req.name)
                .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());
            let mut user = User::new(name, Utc::now()).with_email(email.clone());
            user.phone = non_empty(req.phone);
            user.password_hash = Some(hash);
            let id = user.id;
            db.users.insert(id, user);
            Ok(id)
        })
        .await?;

    tracing::info!(%user_id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "msg": "User created successfully", "user_id": user_id })),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let (session, hash) = {
        let db = state.store.read().await;
        let user = db.user_by_email(&req.email).ok_or_else(invalid)?;
        let hash = user.password_hash.clone().ok_or_else(invalid)?;
        (SessionUser::from(user), hash)
    };
    if !state.passwords.verify_blocking(req.password, hash).await {
        tracing::debug!(user_id = %session.id, "wrong password");
        return Err(invalid());
    }

    let token = state.tokens.issue(session.id)?;
    Ok(Json(json!({ "access_token": token, "user": session })))
}

pub async fn me(
    State(state): State<Arc<ServerState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<UserView>> {
    let db = state.store.read().await;
    Ok(Json(UserView::from(db.user(user_id)?)))
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub async fn update_profile(
    State(state): State<Arc<ServerState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<UserView>> {
    let view = state
        .store
        .mutate(|db| {
            let email = non_empty(req.email).map(|e| e.to_lowercase());
            if let Some(email) = &email {
                if db.user_by_email(email).is_some_and(|u| u.id != user_id) {
                    return Err(ApiError::Conflict("Email already in use".to_string()));
                }
            }
            let user = db.user_mut(user_id)?;
            if let Some(name) = non_empty(req.name) {
                user.name = name;
            }
            if let Some(phone) = req.phone {
                user.phone = non_empty(Some(phone));
            }
            if email.is_some() {
                user.email = email;
            }
            Ok(UserView::from(&*user))
        })
        .await?;
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<Arc<ServerState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<PasswordRequest>,
) -> ApiResult<Json<Value>> {
    if req.new_password.is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let existing = state.store.read().await.user(user_id)?.password_hash.clone();
    // accounts created through Google have no password to confirm
    if let Some(hash) = existing {
        let current = req.current_password.unwrap_or_default();
        if !state.passwords.verify_blocking(current, hash).await {
            return Err(ApiError::bad_request("Current password is incorrect"));
        }
    }

    let hash = state.passwords.hash_blocking(req.new_password).await?;
    state
        .store
        .mutate(|db| {
            db.user_mut(user_id)?.password_hash = Some(hash);
            Ok(())
        })
        .await?;
    Ok(Json(json!({ "msg": "Password updated successfully" })))
}

// ============================================================================
// GOOGLE
// ============================================================================

pub async fn google_login(State(state): State<Arc<ServerState>>) -> ApiResult<Json<Value>> {
    let oauth = google(&state)?;
    let token = state.tokens.issue_oauth_state()?;
    let auth_url = oauth.authorize_url(&token).map_err(ApiError::internal)?;
    Ok(Json(json!({ "auth_url": auth_url })))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn frontend_redirect(state: &ServerState, path: &str, params: &[(&str, &str)]) -> ApiResult<Redirect> {
    let base = format!("{}/{}", state.config.frontend_url.trim_end_matches('/'), path);
    let url = reqwest::Url::parse_with_params(&base, params).map_err(ApiError::internal)?;
    Ok(Redirect::to(url.as_str()))
}

pub async fn google_callback(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let oauth = google(&state)?;

    if let Some(error) = params.error {
        tracing::warn!(%error, "Google sign-in declined");
        return frontend_redirect(&state, "login", &[("error", error.as_str())]);
    }
    let code = params
        .code
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;
    if !params
        .state
        .as_deref()
        .is_some_and(|s| state.tokens.verify_oauth_state(s))
    {
        return Err(ApiError::bad_request("Invalid OAuth state"));
    }

    let profile = match oauth.fetch_profile(&code).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!("Google sign-in failed: {:#}", err);
            return frontend_redirect(&state, "login", &[("error", "oauth_failed")]);
        }
    };

    let user = state
        .store
        .mutate(|db| {
            let id = link_google_user(db, &profile, Utc::now());
            db.user(id).map(SessionUser::from)
        })
        .await?;
    let token = state.tokens.issue(user.id)?;
    let (user_id, role) = (user.id.to_string(), user.role.to_string());

    frontend_redirect(
        &state,
        "oauth-callback",
        &[
            ("token", token.as_str()),
            ("user_id", user_id.as_str()),
            ("name", user.name.as_str()),
            ("role", role.as_str()),
        ],
    )
}
