//! HTTP and WebSocket handlers for the relay.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use super::api::{ClientEvent, RelayEvent, StatusResponse};
use crate::session::Session;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
}

impl AppState {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

/// GET /api/status - Current canonical state.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.session.snapshot().await)
}

/// GET /ws - Realtime event stream and command channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.session))
}

fn encode(event: &RelayEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            tracing::error!(error = %e, event = event.name(), "Failed to encode relay event");
            None
        }
    }
}

/// Serve one viewer until either side closes.
///
/// Inbound requests are handled one at a time, so a viewer's commands reach
/// the driver in the order they were sent.
pub async fn handle_socket(socket: WebSocket, session: Arc<Session>) {
    let client_id = Uuid::new_v4();
    let cancel = session.cancellation_token();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (snapshot, rx) = session.subscribe();
    tracing::info!(client = %client_id, "Client connected");

    if let Some(message) = encode(&RelayEvent::ConnectionUpdate(snapshot)) {
        if ws_tx.send(message).await.is_err() {
            return;
        }
    }

    let mut events = BroadcastStream::new(rx);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            event = events.next() => match event {
                Some(Ok(event)) => {
                    let Some(message) = encode(&event) else { continue };
                    if ws_tx.send(message).await.is_err() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(client = %client_id, skipped, "Client lagging, events skipped");
                }
                None => break,
            },
            message = ws_rx.next() => match message {
                Some(Ok(Message::Text(text))) => handle_text(&session, client_id, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(client = %client_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    tracing::info!(client = %client_id, "Client disconnected");
}

async fn handle_text(session: &Session, client_id: Uuid, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(client = %client_id, error = %e, "Ignoring malformed client event");
            return;
        }
    };

    tracing::debug!(client = %client_id, event = ?event, "Client event");
    match session.handle_client(event).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(client = %client_id, "Driver not running, request dropped"),
        Err(e) => tracing::warn!(client = %client_id, error = %e, "Failed to forward request"),
    }
}
