use axum::routing::get;
use std::sync::Arc;

use super::handler::websocket_handler;
use crate::room::core::RoomServer;

/// Builds the Axum router. The websocket upgrade and the room metadata
/// endpoint unmodified clients poll before connecting both live at `/`
/// (SPEC_FULL.md §4.L) — `websocket_handler` tells them apart by whether
/// the request carries a WebSocket handshake.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<RoomServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/", get(websocket_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
