use anyhow::{anyhow, Context};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::oneshot;

use chess_core::GamePosition;

use crate::error::AppError;
use crate::orchestrator::OrchestratorInput;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GameStateReport {
    pub fen: Option<String>,
    #[serde(rename = "moveCount", default)]
    pub move_count: i64,
}

/// POST /api/game_state
pub async fn report_game_state(
    Extension(state): Extension<AppState>,
    Json(body): Json<GameStateReport>,
) -> Result<Json<JsonValue>, AppError> {
    let fen = body
        .fen
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing FEN".into()))?;
    GamePosition::from_fen(&fen).map_err(|_| AppError::BadRequest("Invalid FEN".into()))?;

    let (reply, result) = oneshot::channel();
    state
        .inputs
        .send(OrchestratorInput::Position {
            fen,
            move_count: body.move_count,
            reply,
        })
        .await
        .map_err(|_| anyhow!("Analysis orchestrator is not running"))?;

    result
        .await
        .context("Analysis orchestrator dropped the request")?
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!({ "status": "success" })))
}
