//! Account maintenance shared by the admin API and the CLI

use chrono::{DateTime, Utc};

use bagsbrats_core::roster::{SeedPlayer, SEED_PHONE, SEED_ROSTER};
use bagsbrats_core::{Role, User, UserId};

use crate::auth::Passwords;
use crate::error::{ApiError, ApiResult};
use crate::state::Database;

/// Password given to accounts created by `activate_user`
pub const DEFAULT_ACTIVATION_PASSWORD: &str = "password123";

/// Grant admin to an existing account
pub fn promote_to_admin(db: &mut Database, email: &str) -> ApiResult<UserId> {
    let user = db.user_by_email_mut(email).ok_or(ApiError::NotFound("User"))?;
    user.role = Role::Admin;
    Ok(user.id)
}

/// Make `email` an admin, creating the account if needed.
///
/// Returns the user id and whether the account was created.
pub fn activate_user(
    db: &mut Database,
    email: &str,
    name: Option<&str>,
    password_hash: String,
    now: DateTime<Utc>,
) -> (UserId, bool) {
    if let Some(user) = db.user_by_email_mut(email) {
        user.role = Role::Admin;
        if let Some(name) = name {
            user.name = name.to_string();
        }
        return (user.id, false);
    }

    let display = name
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());
    let mut user = User::new(display, now).with_email(email.trim().to_lowercase());
    user.role = Role::Admin;
    user.password_hash = Some(password_hash);
    let id = user.id;
    db.users.insert(id, user);
    (id, true)
}

/// Roster entries whose email is not registered yet
pub fn missing_seed_players(db: &Database) -> Vec<&'static SeedPlayer> {
    SEED_ROSTER
        .iter()
        .filter(|p| db.user_by_email(&p.email()).is_none())
        .collect()
}

/// Build seed accounts. Hashing happens here, outside any lock.
pub fn build_seed_users(
    players: &[&SeedPlayer],
    passwords: &Passwords,
    now: DateTime<Utc>,
) -> ApiResult<Vec<User>> {
    players
        .iter()
        .map(|p| {
            let mut user = User::new(p.name, now).with_email(p.email());
            user.phone = Some(SEED_PHONE.to_string());
            user.is_power_player = p.is_power_player;
            user.password_hash = Some(passwords.hash(&p.password())?);
            Ok(user)
        })
        .collect()
}

/// Insert seed accounts, skipping emails registered in the meantime
pub fn insert_seed_users(db: &mut Database, users: Vec<User>) -> usize {
    let mut created = 0;
    for user in users {
        let taken = user
            .email
            .as_deref()
            .is_some_and(|email| db.user_by_email(email).is_some());
        if !taken {
            db.users.insert(user.id, user);
            created += 1;
        }
    }
    created
}

/// Seed the sample roster in one pass. Returns how many accounts were added.
pub fn seed_players(db: &mut Database, passwords: &Passwords, now: DateTime<Utc>) -> ApiResult<usize> {
    let users = build_seed_users(&missing_seed_players(db), passwords, now)?;
    Ok(insert_seed_users(db, users))
}
