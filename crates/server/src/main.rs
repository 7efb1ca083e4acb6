use server::config::Config;
use server::orchestrator::OrchestratorInput;
use server::settings::Settings;
use server::state::AnalysisState;

use analysis_engine::EngineProcess;
use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    let settings = Settings::default();

    let mut engines = Vec::new();
    for engine_config in config.engine_configs(&settings) {
        let mut process = match EngineProcess::spawn(&engine_config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(engine = %engine_config.path, error = %e, "Failed to start engine");
                continue;
            }
        };
        if let Err(e) = process.initialize(&engine_config).await {
            tracing::error!(engine = %engine_config.path, error = %e, "Failed to initialize engine");
            continue;
        }
        engines.push(process);
    }
    if engines.is_empty() {
        tracing::warn!("No engines running; analysis is unavailable");
    } else {
        tracing::info!(count = engines.len(), "Engines ready");
    }

    let (state, orchestrator) = server::start(engines, settings, AnalysisState::default(), &config);
    let app = server::router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await
        .context("Server error")?;

    // Engines are quit by the orchestrator on its way out
    let _ = state.inputs.send(OrchestratorInput::Shutdown).await;
    orchestrator.await.context("Orchestrator task failed")?;
    Ok(())
}
