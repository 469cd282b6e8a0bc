//! HTTP route handlers

pub mod admin;
pub mod auth;
pub mod games;
pub mod player;
pub mod reveal;
pub mod rounds;
pub mod status;
pub mod tournaments;
pub mod ws;

/// Trimmed text, or `None` when blank
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
