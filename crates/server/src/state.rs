use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use analysis_engine::intelligence::DecisionLog;
use analysis_engine::AnalysisSession;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc, watch, Mutex};

use crate::executor::MoveExecutor;
use crate::game_state::GameState;
use crate::orchestrator::OrchestratorInput;
use crate::settings::Settings;

/// Outbound lines buffered per client before it starts lagging
pub const OUTBOUND_CAPACITY: usize = 256;

/// Position and analysis state, locked for a whole processing cycle
pub struct AnalysisState {
    pub game: GameState,
    pub session: AnalysisSession,
    pub executor: MoveExecutor,
    pub decisions: DecisionLog,
    pub rng: StdRng,
}

impl AnalysisState {
    pub fn new(rng: StdRng) -> Self {
        Self {
            game: GameState::new(),
            session: AnalysisSession::new(0, 0),
            executor: MoveExecutor::new(),
            decisions: DecisionLog::new(),
            rng,
        }
    }
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

/// Live engine counts, maintained by the orchestrator
#[derive(Debug, Default)]
pub struct EngineCounts {
    pub total: AtomicUsize,
    pub live: AtomicUsize,
}

impl EngineCounts {
    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.live.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

/// Handles shared by every route
#[derive(Clone)]
pub struct AppState {
    pub inputs: mpsc::Sender<OrchestratorInput>,
    pub analysis: Arc<Mutex<AnalysisState>>,
    pub settings: Arc<watch::Sender<Arc<Settings>>>,
    pub outbound: broadcast::Sender<String>,
    pub engines: Arc<EngineCounts>,
    pub connections: Arc<AtomicUsize>,
}

impl AppState {
    /// Current settings snapshot
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.borrow().clone()
    }
}
