//! Account commands - edit the data file offline
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: make_admin(), activate_user(), seed_players() - orchestration
//! - Level 2: with_database() - load, change, save
//! - Level 3: (delegated to bagsbrats_server::accounts)
//!
//! These commands rewrite the snapshot directly; run them while the server is stopped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use bagsbrats_server::accounts::{self, DEFAULT_ACTIVATION_PASSWORD};
use bagsbrats_server::auth::Passwords;
use bagsbrats_server::{Database, PasswordCost};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args, Debug)]
pub struct DataArgs {
    /// JSON snapshot file holding all tournament data
    #[arg(long, env = "DATA_FILE", default_value = "bagsbrats.json")]
    pub data_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct MakeAdminArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Email of an existing account
    #[arg(long)]
    pub email: String,
}

#[derive(Args, Debug)]
pub struct ActivateUserArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub email: String,

    /// Display name (defaults to the part of the email before '@')
    #[arg(long)]
    pub name: Option<String>,

    /// Password for a newly created account
    #[arg(long, default_value = DEFAULT_ACTIVATION_PASSWORD)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Hash with the cheapest Argon2 settings (rehearsals only)
    #[arg(long)]
    pub fast_hash: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Promote an existing user to admin
pub fn make_admin(args: MakeAdminArgs) -> Result<()> {
    let email = args.email.clone();
    let user_id = with_database(&args.data.data_file, |db| {
        accounts::promote_to_admin(db, &email)
            .map_err(|_| anyhow::anyhow!("no user with email {}", email))
    })?;

    tracing::info!(%user_id, "promoted to admin");
    println!("{} is now an admin", args.email);
    Ok(())
}

/// Promote to admin, creating the account if needed
pub fn activate_user(args: ActivateUserArgs) -> Result<()> {
    let passwords = Passwords::new(PasswordCost::default())?;
    let hash = passwords.hash(&args.password)?;

    let (user_id, created) = with_database(&args.data.data_file, |db| {
        Ok(accounts::activate_user(
            db,
            &args.email,
            args.name.as_deref(),
            hash,
            Utc::now(),
        ))
    })?;

    tracing::info!(%user_id, created, "admin activated");
    if created {
        println!("Created admin {} (password: {})", args.email, args.password);
    } else {
        println!("{} is now an admin", args.email);
    }
    Ok(())
}

/// Add the 24-player sample roster
pub fn seed_players(args: SeedArgs) -> Result<()> {
    let cost = if args.fast_hash {
        PasswordCost::minimal()
    } else {
        PasswordCost::default()
    };
    let passwords = Passwords::new(cost)?;

    let created = with_database(&args.data.data_file, |db| {
        Ok(accounts::seed_players(db, &passwords, Utc::now())?)
    })?;

    println!("Seeded {} players", created);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Load the snapshot, apply `f`, and write it back
fn with_database<T>(path: &Path, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
    let mut db = Database::load_from(path)?;
    let out = f(&mut db)?;
    db.save_to(path)
        .with_context(|| format!("saving {}", path.display()))?;
    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================
