//! Serve command - start the tournament API server
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: (delegated to bagsbrats-server crate)
//! - Level 4: configuration validation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Args;

use bagsbrats_core::model::{MAX_GAME_MINUTES, MAX_ROUNDS_PER_DAY};
use bagsbrats_server::{run_server, GoogleConfig, ServerConfig};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args, Clone, Debug)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, env = "PORT", default_value = "5001")]
    pub port: u16,

    /// Directory containing the built web app
    #[arg(long, env = "STATIC_DIR", default_value = "frontend/dist")]
    pub static_dir: PathBuf,

    /// JSON snapshot file holding all tournament data
    #[arg(long, env = "DATA_FILE", default_value = "bagsbrats.json")]
    pub data_file: PathBuf,

    /// Keep everything in memory (nothing survives a restart)
    #[arg(long)]
    pub in_memory: bool,

    /// Secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// IANA timezone the tournament is played in
    #[arg(long, env = "TOURNAMENT_TIMEZONE", default_value = "America/Chicago")]
    pub timezone: String,

    /// Local hour at which check-in opens on tournament days
    #[arg(long, env = "CHECK_IN_HOUR", default_value = "17")]
    pub check_in_hour: u32,

    /// Default length of a game in minutes
    #[arg(long, default_value = "20")]
    pub game_minutes: i64,

    /// Default number of rounds per tournament day
    #[arg(long, default_value = "3")]
    pub rounds_per_day: u32,

    /// Shuffles tried when searching for the best pairings
    #[arg(long, default_value = "200")]
    pub pairing_attempts: usize,

    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,

    /// Defaults to this server's /auth/google/callback
    #[arg(long, env = "GOOGLE_REDIRECT_URI")]
    pub google_redirect_uri: Option<String>,

    /// Where OAuth sign-ins are redirected back to
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:5173")]
    pub frontend_url: String,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run server command
///
/// This function reads like a table of contents:
/// 1. Configure server
/// 2. Start server (blocking)
pub fn run(args: ServerArgs) -> Result<()> {
    let config = configure_server(&args)?;

    tracing::info!(
        "Starting Bags & Brats server on port {} ({})",
        config.port,
        config.timezone.name()
    );

    start_server(config)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Configure server from command arguments
fn configure_server(args: &ServerArgs) -> Result<ServerConfig> {
    validate_static_dir(&args.static_dir)?;

    let defaults = ServerConfig::default();
    Ok(ServerConfig {
        port: args.port,
        static_dir: args.static_dir.to_string_lossy().to_string(),
        data_file: (!args.in_memory).then(|| args.data_file.clone()),
        jwt_secret: require_secret(args.jwt_secret.as_deref())?,
        timezone: parse_timezone(&args.timezone)?,
        check_in_hour: validate_hour(args.check_in_hour)?,
        rounds_per_day: args.rounds_per_day.clamp(1, MAX_ROUNDS_PER_DAY),
        game_minutes: args.game_minutes.clamp(1, MAX_GAME_MINUTES),
        pairing_attempts: args.pairing_attempts.max(1),
        google: google_config(args),
        frontend_url: args.frontend_url.clone(),
        ..defaults
    })
}

/// Start the server (blocking)
fn start_server(config: ServerConfig) -> Result<()> {
    // Create tokio runtime for async server
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async { run_server(config).await })
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Validate that static directory exists
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!(
            "Static path exists but is not a directory: {}",
            path.display()
        );
    }

    Ok(())
}

fn require_secret(secret: Option<&str>) -> Result<String> {
    match secret.map(str::trim) {
        Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
        _ => anyhow::bail!("JWT_SECRET_KEY must be set (env or --jwt-secret)"),
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("unknown timezone: {}", name))
}

fn validate_hour(hour: u32) -> Result<u32> {
    if hour > 23 {
        anyhow::bail!("check-in hour must be 0-23, got {}", hour);
    }
    Ok(hour)
}

/// Google sign-in is enabled only when both client credentials are present
fn google_config(args: &ServerArgs) -> Option<GoogleConfig> {
    let client_id = args.google_client_id.clone().filter(|s| !s.is_empty())?;
    let client_secret = args.google_client_secret.clone().filter(|s| !s.is_empty())?;
    let redirect_uri = args
        .google_redirect_uri
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}/auth/google/callback", args.port));
    Some(GoogleConfig {
        client_id,
        client_secret,
        redirect_uri,
    })
}

// ============================================================================
// TESTS
// ============================================================================
