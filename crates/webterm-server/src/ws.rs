//! WebSocket endpoint bridging browser sockets to the session registry.

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures::{SinkExt as _, StreamExt as _};
use webterm_protocol::{ConnectParams, WS_PATH, fallback_session_id};

use crate::registry::{Forwarded, SessionRegistry};

pub fn router(registry: SessionRegistry) -> Router {
    Router::new()
        .route(WS_PATH, get(upgrade))
        .with_state(registry)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(registry): State<SessionRegistry>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, registry, params))
}

/// Per-connection protocol handler: attach on connect, forward messages,
/// detach on disconnect. Closing the socket never kills the shell.
async fn handle_socket(socket: WebSocket, registry: SessionRegistry, params: ConnectParams) {
    let session_id = params.session_id.unwrap_or_else(fallback_session_id);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let handle = match registry.attach(&session_id, params.cwd.as_deref()) {
        Ok(handle) => handle,
        Err(e) => {
            let notice = format!("\r\nError starting terminal: {e}\r\n");
            let _ = ws_tx.send(Message::Text(notice.into())).await;
            let _ = ws_tx.close().await;
            return;
        }
    };
    let socket_id = handle.socket_id;
    let mut output = handle.output;

    tracing::debug!(session = %session_id, socket = socket_id, "socket attached");

    let mut send_task = tokio::spawn(async move {
        while let Some(chunk) = output.recv().await {
            if ws_tx.send(Message::Text(chunk.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_registry = registry.clone();
    let recv_session_id = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            match message {
                Message::Text(text) => {
                    let outcome = recv_registry.forward(&recv_session_id, text.as_str()).await;
                    if outcome == Forwarded::Killed {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.detach(&session_id, socket_id);
    tracing::debug!(session = %session_id, socket = socket_id, "socket detached");
}
