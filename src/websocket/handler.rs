use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;
use crate::room::core::RoomServer;

/// Serves both the WebSocket upgrade and the room metadata GET from the
/// same `/` endpoint (spec.md "A WebSocket endpoint at `/`"; SPEC_FULL.md
/// §4.L). A request that carries a WebSocket handshake upgrades; anything
/// else gets the JSON metadata blob unmodified clients poll before
/// connecting. `Option<WebSocketUpgrade>` extracts to `None` instead of
/// rejecting the request when the handshake headers are absent.
pub async fn websocket_handler(
    ws: Option<WebSocketUpgrade>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<RoomServer>>,
) -> Response {
    match ws {
        Some(ws) => ws.on_upgrade(move |socket| handle_socket(socket, server, addr)).into_response(),
        None => {
            let guard = server.lock().await;
            Json(guard.room.metadata(guard.players.count(), server.config.max_players)).into_response()
        }
    }
}
