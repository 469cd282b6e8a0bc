//! Background tasks: the midnight reset and the countdown watcher

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

use bagsbrats_core::timer::expired_games;

use crate::events::ServerEvent;
use crate::state::ServerState;

/// Clear check-in and payment flags at every local midnight
pub fn spawn_midnight_reset(state: Arc<ServerState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = state.check_in.next_local_midnight(now);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(%next, "daily reset scheduled");
            tokio::time::sleep(wait).await;

            match state.store.mutate(|db| Ok(db.reset_daily_status())).await {
                Ok(count) => tracing::info!(users = count, "daily check-in reset"),
                Err(err) => tracing::error!(%err, "daily reset failed"),
            }
        }
    })
}

/// Announce games whose countdown has run out
pub fn spawn_timer_watch(state: Arc<ServerState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.timer_tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            announce_expired(&state, Utc::now()).await;
        }
    })
}

/// Broadcast `game_time_expired` once per expired game. Returns how many were sent.
pub async fn announce_expired(state: &ServerState, now: DateTime<Utc>) -> usize {
    let expired: Vec<_> = {
        let db = state.store.read().await;
        expired_games(db.games.values(), now)
            .into_iter()
            .map(|g| (g.id, g.tournament_id, g.day_index, g.round_number))
            .collect()
    };

    let fresh = state
        .take_unannounced(expired.iter().map(|(id, ..)| *id).collect())
        .await;

    for (game_id, tournament_id, day_index, round_number) in
        expired.into_iter().filter(|(id, ..)| fresh.contains(id))
    {
        tracing::info!(%game_id, round_number, "game time expired");
        state
            .events
            .publish(
                tournament_id,
                ServerEvent::GameTimeExpired {
                    game_id,
                    day_index,
                    round_number,
                },
            )
            .await;
    }
    fresh.len()
}
