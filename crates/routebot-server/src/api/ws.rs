//! WebSocket stream of follower ticks.
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.run_id))
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    /// Only forward ticks of this run.
    run_id: Option<u64>,
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, run_filter: Option<u64>) {
    let mut rx = state.tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(tick) => {
                        if let Some(run_id) = run_filter {
                            if tick.run_id != run_id {
                                continue;
                            }
                        }
                        let payload = match serde_json::to_string(&tick) {
                            Ok(payload) => payload,
                            Err(err) => {
                                tracing::warn!("Failed to encode follower tick: {}", err);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        // Drop missed ticks; the next one carries the current position.
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
