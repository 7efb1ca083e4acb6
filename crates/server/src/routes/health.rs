use std::sync::atomic::Ordering;

use axum::{Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::state::AppState;

/// GET /health
pub async fn health_check(Extension(state): Extension<AppState>) -> Json<JsonValue> {
    let settings = state.settings();
    let (live, total) = state.engines.snapshot();
    let game = state.analysis.lock().await.game.summary();

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "engines": { "live": live, "total": total },
        "connections": state.connections.load(Ordering::Relaxed),
        "intelligence_enabled": settings.intelligence.intelligence_enabled,
        "avoid_low_intelligence": settings.intelligence.avoid_low_intelligence,
        "low_intelligence_threshold": settings.intelligence.threshold(),
        "threat_arrows_enabled": settings.show_threat_arrows,
        "game_state": game,
    }))
}
