//! Bags & Brats Server - HTTP and WebSocket API
//!
//! This crate provides the tournament backend:
//! - REST API for accounts, tournaments, rounds and scores
//! - WebSocket push of tournament events
//! - JSON snapshot persistence
//! - Background tasks (midnight reset, countdown expiry)
//! - Static file serving for the web app

pub mod accounts;
pub mod auth;
pub mod error;
pub mod events;
pub mod oauth;
mod routes;
pub mod scheduler;
pub mod state;
pub mod views;

use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use bagsbrats_core::checkin::DEFAULT_CHECK_IN_HOUR;
use bagsbrats_core::model::{DEFAULT_GAME_MINUTES, DEFAULT_ROUNDS_PER_DAY};

pub use auth::PasswordCost;
pub use error::{ApiError, ApiResult};
pub use oauth::GoogleConfig;
pub use state::{Database, ServerState, Store};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
    /// JSON snapshot file; in-memory only when unset
    pub data_file: Option<PathBuf>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub timezone: Tz,
    pub check_in_hour: u32,
    pub rounds_per_day: u32,
    pub game_minutes: i64,
    pub pairing_attempts: usize,
    /// Fixed seed for reproducible pairings
    pub pairing_seed: Option<u64>,
    pub password_cost: PasswordCost,
    pub google: Option<GoogleConfig>,
    pub frontend_url: String,
    /// How often the countdown watcher looks for expired games
    pub timer_tick: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            static_dir: "frontend/dist".to_string(),
            data_file: None,
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl_hours: 8,
            timezone: chrono_tz::America::Chicago,
            check_in_hour: DEFAULT_CHECK_IN_HOUR,
            rounds_per_day: DEFAULT_ROUNDS_PER_DAY,
            game_minutes: DEFAULT_GAME_MINUTES,
            pairing_attempts: 200,
            pairing_seed: None,
            password_cost: PasswordCost::default(),
            google: None,
            frontend_url: "http://localhost:5173".to_string(),
            timer_tick: Duration::from_secs(1),
        }
    }
}

/// Create the router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&state.config.static_dir);

    Router::new()
        // Status
        .route("/health", get(routes::status::health))
        // Accounts
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/google", get(routes::auth::google_login))
        .route("/auth/google/callback", get(routes::auth::google_callback))
        .route("/user/profile", put(routes::auth::update_profile))
        .route("/user/password", put(routes::auth::change_password))
        // Player
        .route("/player/check-in", post(routes::player::check_in))
        .route("/player/current-game", get(routes::player::current_game))
        // Tournaments
        .route("/tournaments", post(routes::tournaments::create_tournament))
        .route("/tournaments/active", get(routes::tournaments::active_tournament))
        .route("/tournaments/active/games", get(routes::games::active_games))
        .route("/tournaments/standings", get(routes::tournaments::standings))
        .route("/tournaments/time-info", get(routes::tournaments::time_info))
        .route("/tournaments/reveal", get(routes::reveal::revealed))
        // Games
        .route("/games/:game_id/submit", post(routes::games::submit_score))
        .route("/games/:game_id/start", post(routes::games::start_game))
        // Admin: roster
        .route("/admin/proxy-register", post(routes::admin::proxy_register))
        .route("/admin/users", get(routes::admin::list_users))
        .route("/admin/users/seed", post(routes::admin::seed_users))
        .route("/admin/users/bulk-delete", delete(routes::admin::delete_all_players))
        .route(
            "/admin/users/:user_id",
            put(routes::admin::update_user).delete(routes::admin::delete_user),
        )
        .route("/admin/users/:user_id/role", post(routes::admin::update_role))
        .route("/admin/users/:user_id/check-in", post(routes::admin::set_check_in))
        // Admin: rounds and games
        .route("/admin/generate-pairings", post(routes::rounds::generate_pairings))
        .route("/admin/round/status", get(routes::rounds::round_status))
        .route("/admin/round/start", post(routes::rounds::start_round))
        .route("/admin/round/stop", post(routes::rounds::stop_round))
        .route("/admin/tournament/start-all", post(routes::rounds::start_all))
        .route("/admin/games", get(routes::games::admin_games))
        .route("/admin/games/:game_id", post(routes::games::update_game))
        // Admin: tournament controls
        .route("/admin/tournament/blackout", post(routes::admin::set_blackout))
        .route("/admin/tournament/check-in", post(routes::admin::set_check_in_open))
        .route("/admin/tournament/next-day", post(routes::admin::next_day))
        .route("/admin/tournament/complete", post(routes::admin::complete_tournament))
        .route("/admin/tournament/top-teams", get(routes::reveal::top_teams))
        .route("/admin/tournament/reveal", post(routes::reveal::reveal_place))
        .route(
            "/admin/tournaments/bulk-delete",
            delete(routes::admin::delete_all_tournaments),
        )
        // Realtime
        .route("/ws", get(routes::ws::ws_handler))
        // Shared state
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        // Static file serving (must be last)
        .fallback_service(static_service)
}

/// Start the HTTP server with its background tasks
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(ServerState::new(config)?);

    let reset_task = scheduler::spawn_midnight_reset(state.clone());
    let timer_task = scheduler::spawn_timer_watch(state.clone());
    let router = create_router(state.clone());

    tracing::info!("Bags & Brats server starting on http://0.0.0.0:{}", state.config.port);
    tracing::info!("Static files served from: {}", state.config.static_dir);
    match &state.config.data_file {
        Some(path) => tracing::info!("Persisting to {}", path.display()),
        None => tracing::warn!("No data file configured; state is in-memory only"),
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reset_task.abort();
    timer_task.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
