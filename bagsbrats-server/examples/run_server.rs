//! Example to run the Bags & Brats server standalone with a local data file
//!
//! Run with: cargo run -p bagsbrats-server --example run_server

use bagsbrats_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        port: 5001,
        data_file: Some("bagsbrats-dev.json".into()),
        jwt_secret: std::env::var("JWT_SECRET_KEY").unwrap_or_else(|_| "dev-secret".to_string()),
        ..ServerConfig::default()
    };

    println!("Starting Bags & Brats server on port {}", config.port);
    println!("Static files from: {}", config.static_dir);
    println!("Health check: http://localhost:{}/health", config.port);

    run_server(config).await
}
