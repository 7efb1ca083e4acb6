pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod game_state;
pub mod orchestrator;
pub mod protocol;
pub mod routes;
pub mod settings;
pub mod state;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use analysis_engine::EngineProcess;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::orchestrator::{Orchestrator, OrchestratorInput};
use crate::settings::Settings;
use crate::state::{AnalysisState, AppState, EngineCounts, OUTBOUND_CAPACITY};

/// Client-originated inputs queued ahead of the orchestrator
const INPUT_CAPACITY: usize = 64;

/// Build shared state and start the orchestrator task that owns `engines`
pub fn start(
    engines: Vec<EngineProcess>,
    settings: Settings,
    analysis: AnalysisState,
    config: &Config,
) -> (AppState, JoinHandle<()>) {
    let (inputs, input_rx) = mpsc::channel::<OrchestratorInput>(INPUT_CAPACITY);
    let (settings_tx, _) = watch::channel(Arc::new(settings));
    let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);

    let state = AppState {
        inputs,
        analysis: Arc::new(Mutex::new(analysis)),
        settings: Arc::new(settings_tx),
        outbound,
        engines: Arc::new(EngineCounts::default()),
        connections: Arc::new(AtomicUsize::new(0)),
    };

    let orchestrator = Orchestrator::new(engines, input_rx, &state, config);
    let handle = tokio::spawn(orchestrator.run());
    (state, handle)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(routes::ws::ws_handler))
        .route("/api/game_state", post(routes::game_state::report_game_state))
        .route(
            "/api/settings",
            get(routes::settings::get_settings).post(routes::settings::update_settings),
        )
        .route(
            "/api/intelligence_stats",
            get(routes::stats::intelligence_stats),
        )
        .layer(Extension(state))
        .layer(cors)
}
