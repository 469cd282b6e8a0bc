//! Google sign-in (authorization code flow)

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use bagsbrats_core::{User, UserId};

use crate::state::Database;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Identity returned by the userinfo endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct GoogleOAuth {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn authorize_url(&self, state: &str) -> anyhow::Result<String> {
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )?;
        Ok(url.into())
    }

    /// Trade the callback code for the user's Google profile
    pub async fn fetch_profile(&self, code: &str) -> anyhow::Result<GoogleProfile> {
        let token: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("token request failed")?
            .error_for_status()
            .context("token exchange rejected")?
            .json()
            .await
            .context("malformed token response")?;

        self.http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("userinfo request failed")?
            .error_for_status()
            .context("userinfo rejected")?
            .json()
            .await
            .context("malformed userinfo response")
    }
}

/// Find the account for a Google identity, linking by email or creating one
pub fn link_google_user(db: &mut Database, profile: &GoogleProfile, now: DateTime<Utc>) -> UserId {
    if let Some(user) = db.user_by_google_id(&profile.id) {
        return user.id;
    }

    if let Some(email) = profile.email.as_deref() {
        if let Some(user) = db.user_by_email_mut(email) {
            user.google_id = Some(profile.id.clone());
            tracing::info!(user_id = %user.id, "linked Google account by email");
            return user.id;
        }
    }

    let name = profile
        .name
        .clone()
        .or_else(|| profile.email.clone())
        .unwrap_or_else(|| "Google User".to_string());
    let mut user = User::new(name, now);
    user.email = profile.email.clone();
    user.google_id = Some(profile.id.clone());
    let id = user.id;
    tracing::info!(user_id = %id, "created user from Google sign-in");
    db.users.insert(id, user);
    id
}
