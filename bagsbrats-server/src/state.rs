//! Server state management
//!
//! The tournament database lives in memory behind a single `RwLock`. When a
//! data file is configured, every committed mutation is followed by a JSON
//! snapshot written to a temp file and renamed into place.

use anyhow::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};

use bagsbrats_core::{
    CheckInWindow, Game, GameId, PairingConfig, Tournament, TournamentId, User, UserId,
};

use crate::auth::{Passwords, Tokens};
use crate::error::{ApiError, ApiResult};
use crate::events::EventHub;
use crate::oauth::GoogleOAuth;
use crate::ServerConfig;

// ============================================================================
// DATABASE
// ============================================================================

/// Everything the server persists
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub tournaments: BTreeMap<TournamentId, Tournament>,
    #[serde(default)]
    pub games: BTreeMap<GameId, Game>,
}

impl Database {
    /// Load a snapshot; a missing file is an empty database
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| email_matches(u, email))
    }

    pub fn user_by_email_mut(&mut self, email: &str) -> Option<&mut User> {
        self.users.values_mut().find(|u| email_matches(u, email))
    }

    pub fn user_by_google_id(&self, google_id: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
    }

    pub fn user(&self, id: UserId) -> ApiResult<&User> {
        self.users.get(&id).ok_or(ApiError::NotFound("User"))
    }

    pub fn user_mut(&mut self, id: UserId) -> ApiResult<&mut User> {
        self.users.get_mut(&id).ok_or(ApiError::NotFound("User"))
    }

    pub fn name_of(&self, id: UserId) -> Option<String> {
        self.users.get(&id).map(|u| u.name.clone())
    }

    /// The tournament currently in play (the newest one not complete)
    pub fn open_tournament(&self) -> Option<&Tournament> {
        self.tournaments
            .values()
            .filter(|t| t.is_open())
            .max_by_key(|t| t.created_at)
    }

    /// The open tournament, or the latest one once everything is complete
    pub fn current_tournament(&self) -> Option<&Tournament> {
        self.open_tournament()
            .or_else(|| self.tournaments.values().max_by_key(|t| t.created_at))
    }

    pub fn require_open_tournament(&self) -> ApiResult<&Tournament> {
        self.open_tournament()
            .ok_or(ApiError::NotFound("Active tournament"))
    }

    pub fn open_tournament_mut(&mut self) -> ApiResult<&mut Tournament> {
        let id = self.require_open_tournament()?.id;
        self.tournaments
            .get_mut(&id)
            .ok_or(ApiError::NotFound("Active tournament"))
    }

    pub fn tournament_games(&self, tournament_id: TournamentId) -> impl Iterator<Item = &Game> {
        self.games
            .values()
            .filter(move |g| g.tournament_id == tournament_id)
    }

    /// Games of one round, mutable, ordered by court
    pub fn round_games_mut(
        &mut self,
        tournament_id: TournamentId,
        day_index: usize,
        round_number: u32,
    ) -> Vec<&mut Game> {
        let mut games: Vec<&mut Game> = self
            .games
            .values_mut()
            .filter(|g| g.tournament_id == tournament_id && g.is_in_round(day_index, round_number))
            .collect();
        games.sort_by_key(|g| g.court);
        games
    }

    pub fn game(&self, id: GameId) -> ApiResult<&Game> {
        self.games.get(&id).ok_or(ApiError::NotFound("Game"))
    }

    pub fn game_mut(&mut self, id: GameId) -> ApiResult<&mut Game> {
        self.games.get_mut(&id).ok_or(ApiError::NotFound("Game"))
    }

    /// Clear check-in and payment for everyone. Returns how many changed.
    pub fn reset_daily_status(&mut self) -> usize {
        let mut changed = 0;
        for user in self.users.values_mut() {
            if user.checked_in || user.has_paid || user.checked_in_at.is_some() {
                user.reset_daily_status();
                changed += 1;
            }
        }
        changed
    }
}

fn email_matches(user: &User, email: &str) -> bool {
    user.email
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case(email.trim()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// STORE
// ============================================================================

/// Shared database with ordered snapshot persistence
pub struct Store {
    db: RwLock<Database>,
    path: Option<PathBuf>,
    persist: Mutex<()>,
}

impl Store {
    pub fn in_memory(db: Database) -> Self {
        Self {
            db: RwLock::new(db),
            path: None,
            persist: Mutex::new(()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let db = Database::load_from(&path)?;
        tracing::info!(
            users = db.users.len(),
            tournaments = db.tournaments.len(),
            games = db.games.len(),
            "loaded {}",
            path.display()
        );
        Ok(Self {
            db: RwLock::new(db),
            path: Some(path),
            persist: Mutex::new(()),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Database> {
        self.db.read().await
    }

    /// Run `f` under the write lock and persist if it succeeds.
    ///
    /// `f` must validate before it mutates; an `Err` is not rolled back.
    pub async fn mutate<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Database) -> ApiResult<T>,
    {
        let mut db = self.db.write().await;
        let out = f(&mut db)?;

        let Some(path) = &self.path else {
            return Ok(out);
        };
        let snapshot = serde_json::to_vec_pretty(&*db).map_err(ApiError::internal)?;
        // taken before the write lock is released so snapshots land in commit order
        let _persist = self.persist.lock().await;
        drop(db);

        if let Err(err) = write_snapshot(path, snapshot).await {
            tracing::error!("failed to persist {}: {:#}", path.display(), err);
        }
        Ok(out)
    }
}

async fn write_snapshot(path: &Path, bytes: Vec<u8>) -> anyhow::Result<()> {
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

// ============================================================================
// SERVER STATE
// ============================================================================

/// Server-wide shared state
pub struct ServerState {
    pub config: ServerConfig,
    pub store: Store,
    pub events: EventHub,
    pub tokens: Tokens,
    pub passwords: Passwords,
    pub check_in: CheckInWindow,
    pub pairing: PairingConfig,
    pub google: Option<GoogleOAuth>,
    pairing_rng: Mutex<ChaCha8Rng>,
    announced_expiries: Mutex<HashSet<GameId>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = match &config.data_file {
            Some(path) => Store::open(path)?,
            None => Store::in_memory(Database::default()),
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: ServerConfig, store: Store) -> anyhow::Result<Self> {
        let rng = match config.pairing_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let pairing = PairingConfig {
            attempts: config.pairing_attempts,
            ..PairingConfig::default()
        };
        Ok(Self {
            store,
            events: EventHub::default(),
            tokens: Tokens::new(&config.jwt_secret, config.token_ttl_hours),
            passwords: Passwords::new(config.password_cost)?,
            check_in: CheckInWindow::new(config.timezone, config.check_in_hour),
            pairing,
            google: config.google.clone().map(GoogleOAuth::new),
            pairing_rng: Mutex::new(rng),
            announced_expiries: Mutex::new(HashSet::new()),
            config,
        })
    }

    pub async fn pairing_rng(&self) -> tokio::sync::MutexGuard<'_, ChaCha8Rng> {
        self.pairing_rng.lock().await
    }

    /// Keep only the expired games not yet announced, marking them announced
    pub async fn take_unannounced(&self, expired: Vec<GameId>) -> Vec<GameId> {
        let mut announced = self.announced_expiries.lock().await;
        // forget games that are no longer expired-and-active
        announced.retain(|id| expired.contains(id));
        expired
            .into_iter()
            .filter(|id| announced.insert(*id))
            .collect()
    }
}
