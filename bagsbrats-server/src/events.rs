//! Tournament rooms and the events pushed to them

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use bagsbrats_core::{GameId, PodiumPlace, TeamStanding, TournamentId};

use crate::views::GameView;

const ROOM_CAPACITY: usize = 64;

/// Pushed to every socket joined to a tournament room
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    PairingsRevealed(Vec<GameView>),
    BlackoutStatus {
        is_blackout: bool,
    },
    StandingsUpdated {},
    RoundStarted {
        day_index: usize,
        round_number: u32,
        end_time: DateTime<Utc>,
    },
    RoundStopped {
        day_index: usize,
        round_number: u32,
        finalized: usize,
    },
    GameStarted {
        game_id: GameId,
        end_time: DateTime<Utc>,
    },
    GameTimeExpired {
        game_id: GameId,
        day_index: usize,
        round_number: u32,
    },
    PodiumRevealed {
        place: PodiumPlace,
        team: Option<TeamStanding>,
    },
    CheckInStatus {
        open: bool,
    },
}

/// One broadcast channel per tournament
#[derive(Default)]
pub struct EventHub {
    rooms: RwLock<HashMap<TournamentId, broadcast::Sender<ServerEvent>>>,
}

impl EventHub {
    /// Send to a room. Returns how many sockets received it.
    pub async fn publish(&self, room: TournamentId, event: ServerEvent) -> usize {
        let rooms = self.rooms.read().await;
        match rooms.get(&room) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub async fn subscribe(&self, room: TournamentId) -> broadcast::Receiver<ServerEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }
}
