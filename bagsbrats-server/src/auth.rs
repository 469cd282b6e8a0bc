//! Password hashing, access tokens and the auth extractors

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bagsbrats_core::{User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::ServerState;

const OAUTH_STATE_PURPOSE: &str = "oauth_state";
const OAUTH_STATE_MINUTES: i64 = 10;

// ============================================================================
// PASSWORDS
// ============================================================================

/// Argon2id cost parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
        }
    }
}

impl PasswordCost {
    /// Cheapest accepted setting, for tests and seeding scripts
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
        }
    }
}

#[derive(Clone)]
pub struct Passwords {
    argon: Argon2<'static>,
}

impl Passwords {
    pub fn new(cost: PasswordCost) -> anyhow::Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow::anyhow!("invalid password cost: {e}"))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(ApiError::internal)
    }

    /// [`Passwords::hash`] on the blocking pool
    pub async fn hash_blocking(&self, password: String) -> ApiResult<String> {
        let passwords = self.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(ApiError::internal)?
    }

    /// [`Passwords::verify`] on the blocking pool
    pub async fn verify_blocking(&self, password: String, hash: String) -> bool {
        let passwords = self.clone();
        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .unwrap_or_else(|err| {
                tracing::error!(%err, "password check did not finish");
                false
            })
    }

    /// False for a wrong password or an unreadable hash
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                tracing::warn!(%err, "stored password hash is malformed");
                false
            }
        }
    }
}

// ============================================================================
// TOKENS
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: usize,
    exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
}

/// HS256 signer for access tokens and OAuth state
pub struct Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Tokens {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    fn sign(&self, sub: String, ttl: Duration, purpose: Option<&str>) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
            purpose: purpose.map(str::to_string),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(ApiError::internal)
    }

    fn claims(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| tracing::debug!(%err, "rejected token"))
            .ok()
    }

    pub fn issue(&self, user_id: UserId) -> ApiResult<String> {
        self.sign(user_id.to_string(), self.ttl, None)
    }

    /// Resolve an access token to its user id
    pub fn verify(&self, token: &str) -> ApiResult<UserId> {
        self.claims(token)
            .filter(|c| c.purpose.is_none())
            .and_then(|c| c.sub.parse().ok())
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
    }

    /// Short-lived token carried through the OAuth redirect
    pub fn issue_oauth_state(&self) -> ApiResult<String> {
        self.sign(
            uuid::Uuid::new_v4().to_string(),
            Duration::minutes(OAUTH_STATE_MINUTES),
            Some(OAUTH_STATE_PURPOSE),
        )
    }

    pub fn verify_oauth_state(&self, state: &str) -> bool {
        self.claims(state)
            .is_some_and(|c| c.purpose.as_deref() == Some(OAUTH_STATE_PURPOSE))
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Caller identified by a bearer token
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub UserId);

#[axum::async_trait]
impl FromRequestParts<Arc<ServerState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".to_string()))?;
        state.tokens.verify(token.trim()).map(AuthUser)
    }
}

/// Caller that must hold the admin role
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<ServerState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(id) = AuthUser::from_request_parts(parts, state).await?;
        let db = state.store.read().await;
        match db.users.get(&id) {
            Some(user) if user.is_admin() => Ok(AdminUser(user.clone())),
            _ => Err(ApiError::AdminRequired),
        }
    }
}
