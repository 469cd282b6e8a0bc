//! Realtime socket: clients join a tournament room and receive its events

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use bagsbrats_core::TournamentId;

use crate::events::ServerEvent;
use crate::state::ServerState;

#[derive(Deserialize)]
pub struct WsParams {
    pub tournament_id: Option<TournamentId>,
}

#[derive(Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ClientEvent {
    JoinTournament { tournament_id: TournamentId },
    LeaveTournament,
    Ping,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    Query(params): Query<WsParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.tournament_id))
}

async fn next_event(room: &mut Option<broadcast::Receiver<ServerEvent>>) -> Result<ServerEvent, RecvError> {
    match room {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>, initial: Option<TournamentId>) {
    let (mut sender, mut receiver) = socket.split();
    let mut room = match initial {
        Some(id) => Some(state.events.subscribe(id).await),
        None => None,
    };

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Ping(payload))) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };

                let reply = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::JoinTournament { tournament_id }) => {
                        // replacing the receiver leaves the previous room
                        room = Some(state.events.subscribe(tournament_id).await);
                        tracing::debug!(%tournament_id, "socket joined tournament");
                        json!({ "event": "joined", "data": { "tournament_id": tournament_id } })
                    }
                    Ok(ClientEvent::LeaveTournament) => {
                        room = None;
                        json!({ "event": "left", "data": {} })
                    }
                    Ok(ClientEvent::Ping) => json!({ "event": "pong", "data": {} }),
                    Err(err) => {
                        tracing::debug!(%err, "unreadable socket message");
                        json!({ "event": "error", "data": { "message": "Unrecognized message" } })
                    }
                };
                if sender.send(Message::Text(reply.to_string())).await.is_err() {
                    break;
                }
            }
            event = next_event(&mut room) => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(err) => {
                            tracing::error!(%err, "failed to encode event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "socket fell behind; events dropped");
                }
                Err(RecvError::Closed) => room = None,
            }
        }
    }
    tracing::debug!("socket closed");
}
