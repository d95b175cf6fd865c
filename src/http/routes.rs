//! HTTP route definitions

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Path the WebSocket endpoint is always reachable on, besides the configured one
const WS_FALLBACK_PATH: &str = "/ws";

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let ws_path = state.config.ws_path.clone();

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route(&ws_path, get(ws_handler));
    if ws_path != WS_FALLBACK_PATH {
        router = router.route(WS_FALLBACK_PATH, get(ws_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_players: state.arena.player_count(),
    })
}
