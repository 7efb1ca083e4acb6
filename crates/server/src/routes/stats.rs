use analysis_engine::intelligence::{DecisionStats, IntelligenceConfig};
use axum::{Extension, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IntelligenceStats {
    #[serde(flatten)]
    pub decisions: DecisionStats,
    pub intelligence_enabled: bool,
    pub avoid_low_intelligence: bool,
    pub low_intelligence_threshold: f64,
    pub current_settings: IntelligenceConfig,
}

/// GET /api/intelligence_stats
pub async fn intelligence_stats(Extension(state): Extension<AppState>) -> Json<IntelligenceStats> {
    let settings = state.settings();
    let decisions = state.analysis.lock().await.decisions.stats();
    let config = settings.intelligence.clone();

    Json(IntelligenceStats {
        decisions,
        intelligence_enabled: config.intelligence_enabled,
        avoid_low_intelligence: config.avoid_low_intelligence,
        low_intelligence_threshold: config.threshold(),
        current_settings: config,
    })
}
