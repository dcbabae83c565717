//! WebSocket subscriber transport.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::{debug, error, warn};

use mailwatch::HubMessage;

use crate::state::AppState;

pub(crate) async fn websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

/// Forwards hub messages to the socket as JSON text frames until either side
/// goes away. Inbound frames other than close are ignored.
async fn serve_subscriber(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = match state.hub.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Failed to register subscriber: {}", e);
            return;
        }
    };
    let id = subscription.id();
    debug!(subscriber = id, "WebSocket subscriber connected");

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(message) = outbound else {
                    debug!(subscriber = id, "Dropped by hub");
                    break;
                };
                let Some(frame) = encode(&message) else {
                    continue;
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unsubscribe(id).await;
    debug!(subscriber = id, "WebSocket subscriber disconnected");
}

fn encode(message: &HubMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Failed to encode {} message: {}", message.kind(), e);
            None
        }
    }
}
