use std::sync::Arc;

use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::error::AppError;
use crate::settings::Settings;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    pub settings: JsonValue,
}

/// GET /api/settings
pub async fn get_settings(Extension(state): Extension<AppState>) -> Json<Settings> {
    Json(state.settings().as_ref().clone())
}

/// POST /api/settings: partial update, swapped in as a new snapshot
pub async fn update_settings(
    Extension(state): Extension<AppState>,
    Json(body): Json<SettingsUpdate>,
) -> Result<Json<JsonValue>, AppError> {
    let current = state.settings();
    let merged = current
        .merge(&body.settings)
        .map_err(|e| AppError::BadRequest(format!("Invalid settings: {e}")))?;

    info!(
        depth = merged.depth,
        multipv = merged.multipv,
        intelligence = merged.intelligence.intelligence_enabled,
        auto_move = merged.legit_auto_move,
        "Settings updated"
    );
    state.settings.send_replace(Arc::new(merged));

    Ok(Json(json!({ "status": "success" })))
}
