//! Bags & Brats CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the tournament server
//! - make-admin: Promote an existing account
//! - activate-user: Promote or create an admin account
//! - seed-players: Add the sample roster

mod accounts;
mod server;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bagsbrats")]
#[command(about = "Bags & Brats cornhole tournament server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve(server::ServerArgs),
    /// Promote an existing user to admin
    MakeAdmin(accounts::MakeAdminArgs),
    /// Promote a user to admin, creating the account if needed
    ActivateUser(accounts::ActivateUserArgs),
    /// Add the 24 sample players (a@a.com / a ... x@x.com / x)
    SeedPlayers(accounts::SeedArgs),
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args),
        Commands::MakeAdmin(args) => accounts::make_admin(args),
        Commands::ActivateUser(args) => accounts::activate_user(args),
        Commands::SeedPlayers(args) => accounts::seed_players(args),
    }
}
