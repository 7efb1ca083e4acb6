//! Single owner of every engine process
//!
//! Clients and HTTP handlers never touch an engine directly. They post an
//! [`OrchestratorInput`]; the orchestrator queues engine commands, polls
//! engine output on a fixed tick and runs one processing cycle per batch
//! while holding the analysis lock. Commands for clients go out on the
//! broadcast channel.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use analysis_engine::config::set_option;
use analysis_engine::intelligence::{decide, Decision, IntelligenceEngine, PositionContext};
use analysis_engine::{detect_threats, AnalysisSession, EngineProcess, FinishedAnalysis, SessionEvent};
use chess_core::{RulesError, STARTING_FEN};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::commands::{generate_commands, CycleView};
use crate::config::Config;
use crate::game_state::PositionUpdate;
use crate::settings::Settings;
use crate::state::{AnalysisState, AppState, EngineCounts};

/// Node budget for Maia searches
const MAIA_NODES: u32 = 100;

pub enum OrchestratorInput {
    /// UCI text from a client, forwarded to every live engine
    ClientCommand(String),
    /// Position reported by the client page
    Position {
        fen: String,
        move_count: i64,
        reply: oneshot::Sender<Result<(), RulesError>>,
    },
    Shutdown,
}

struct EngineSlot {
    process: EngineProcess,
    searching: bool,
    /// `bestmove` lines still owed by searches that were superseded
    stale_bestmoves: u32,
}

pub struct Orchestrator {
    slots: Vec<EngineSlot>,
    inputs: mpsc::Receiver<OrchestratorInput>,
    state: Arc<Mutex<AnalysisState>>,
    settings: watch::Receiver<Arc<Settings>>,
    outbound: broadcast::Sender<String>,
    counts: Arc<EngineCounts>,
    poll_interval: Duration,
    analysis_timeout: Duration,
    session_id: u64,
    awaiting_result: bool,
}

impl Orchestrator {
    pub fn new(
        engines: Vec<EngineProcess>,
        inputs: mpsc::Receiver<OrchestratorInput>,
        app: &AppState,
        config: &Config,
    ) -> Self {
        app.engines.total.store(engines.len(), Ordering::Relaxed);
        app.engines.live.store(engines.len(), Ordering::Relaxed);
        Self {
            slots: engines
                .into_iter()
                .map(|process| EngineSlot {
                    process,
                    searching: false,
                    stale_bestmoves: 0,
                })
                .collect(),
            inputs,
            state: Arc::clone(&app.analysis),
            settings: app.settings.subscribe(),
            outbound: app.outbound.clone(),
            counts: Arc::clone(&app.engines),
            poll_interval: config.poll_interval,
            analysis_timeout: config.analysis_timeout,
            session_id: 0,
            awaiting_result: false,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(engines = self.slots.len(), "Orchestrator started");

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(OrchestratorInput::Shutdown) | None => break,
                    Some(input) => self.handle_input(input).await,
                },
                _ = ticker.tick() => self.cycle().await,
            }
        }

        for slot in &mut self.slots {
            slot.process.quit().await;
        }
        self.counts.live.store(0, Ordering::Relaxed);
        info!("Orchestrator stopped");
    }

    async fn handle_input(&mut self, input: OrchestratorInput) {
        match input {
            OrchestratorInput::ClientCommand(command) => self.forward(&command).await,
            OrchestratorInput::Position {
                fen,
                move_count,
                reply,
            } => {
                let result = self.apply_position(&fen, move_count).await;
                let _ = reply.send(result);
            }
            OrchestratorInput::Shutdown => {}
        }
    }

    async fn forward(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }

        let repositions = command.starts_with("position ");
        let searching = command == "go" || command.starts_with("go ");
        if repositions || searching {
            let depth = go_depth(command).unwrap_or_else(|| self.settings.borrow().depth);
            let state = Arc::clone(&self.state);
            let mut guard = state.lock().await;
            let st = &mut *guard;
            if let Some(fen) = command.strip_prefix("position fen ") {
                if let Err(e) = st.game.update_position(fen) {
                    warn!(error = %e, "Client sent an invalid position");
                }
            }
            self.supersede(st, depth);
            if searching {
                self.awaiting_result = true;
            }
        }

        for slot in self.slots.iter_mut().filter(|s| s.process.is_alive()) {
            slot.process.send(command);
            if searching {
                slot.searching = true;
            }
        }
        debug!(cmd = %command, session = self.session_id, "Forwarded client command");
    }

    async fn apply_position(&mut self, fen: &str, move_count: i64) -> Result<(), RulesError> {
        let settings = self.settings.borrow().clone();
        let state = Arc::clone(&self.state);
        let mut guard = state.lock().await;
        let st = &mut *guard;

        let update = st.game.update_position(fen)?;
        if update == PositionUpdate::NewGame {
            st.executor.reset();
        }
        let mut analysed = update == PositionUpdate::Unchanged && self.session_id > 0;
        if move_count <= 1 {
            st.executor.reset();
            self.supersede(st, settings.depth);
            analysed = false;
        }

        if fen.trim() != STARTING_FEN && move_count > 0 && !analysed {
            self.start_analysis(st, &settings);
        }
        Ok(())
    }

    /// Stop in-flight searches and open an empty session under a new id.
    ///
    /// Every stopped search still owes a `bestmove`; it is counted so the
    /// reply and the `info` lines ahead of it never reach the new session.
    fn supersede(&mut self, st: &mut AnalysisState, target_depth: u32) {
        self.session_id += 1;
        self.awaiting_result = false;
        st.session = AnalysisSession::new(self.session_id, target_depth);

        for slot in self
            .slots
            .iter_mut()
            .filter(|s| s.searching && s.process.is_alive())
        {
            slot.process.send("stop");
            slot.stale_bestmoves += 1;
            slot.searching = false;
            debug!(engine = %slot.process.name(), session = self.session_id, "Stopped superseded search");
        }
    }

    /// Start a fresh session on the tracked position
    fn start_analysis(&mut self, st: &mut AnalysisState, settings: &Settings) {
        self.supersede(st, settings.depth);
        self.awaiting_result = true;

        let position = format!("position fen {}", st.game.fen());
        for slot in self.slots.iter_mut().filter(|s| s.process.is_alive()) {
            slot.process.send(&position);
            if slot.process.is_maia() {
                slot.process.send(&format!("go nodes {MAIA_NODES}"));
            } else {
                slot.process.send(&set_option("MultiPV", settings.multipv));
                slot.process.send(&format!("go depth {}", settings.depth));
            }
            slot.searching = true;
        }
        info!(
            session = self.session_id,
            fen = %st.game.fen(),
            depth = settings.depth,
            "Analysis started"
        );
    }

    fn primary_is_maia(&self) -> bool {
        self.slots
            .iter()
            .find(|s| s.process.is_alive())
            .is_some_and(|s| s.process.is_maia())
    }

    /// Drain every engine once, then process the batch under the analysis lock
    async fn cycle(&mut self) {
        let settings = self.settings.borrow().clone();

        let mut batch: Vec<(usize, String)> = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.process.is_alive() {
                continue;
            }
            match slot.process.drain_available().await {
                Ok(lines) => batch.extend(lines.into_iter().map(|line| (index, line))),
                Err(e) => {
                    error!(engine = %slot.process.name(), error = %e, "Engine lost");
                    slot.searching = false;
                    slot.stale_bestmoves = 0;
                }
            }
        }
        let live = self.slots.iter().filter(|s| s.process.is_alive()).count();
        self.counts.live.store(live, Ordering::Relaxed);

        if batch.is_empty() && !self.awaiting_result {
            return;
        }

        let state = Arc::clone(&self.state);
        let mut guard = state.lock().await;
        let st = &mut *guard;

        let mut changed = false;
        let mut finished: Option<FinishedAnalysis> = None;
        for (index, line) in batch {
            let slot = &mut self.slots[index];
            if line.starts_with("bestmove") {
                slot.searching = false;
                if slot.stale_bestmoves > 0 {
                    slot.stale_bestmoves -= 1;
                    debug!(engine = %slot.process.name(), "Discarded bestmove from superseded search");
                    continue;
                }
            } else if slot.stale_bestmoves > 0 {
                continue;
            }

            match st.session.process_line(&line, st.game.position()) {
                SessionEvent::Progress | SessionEvent::Candidate => changed = true,
                SessionEvent::Finished(done) => finished = Some(done),
                SessionEvent::Rejected(_) | SessionEvent::Ignored => {}
            }
        }

        if finished.is_none() {
            finished = self.check_timeout(st);
        }
        if !changed && finished.is_none() {
            return;
        }

        if let Some(evaluation) = st.session.evaluation {
            st.game.current_evaluation = evaluation;
        }

        let decision = match &finished {
            Some(done) => self.finish(st, done, &settings),
            None => None,
        };

        let threats = settings
            .show_threat_arrows
            .then(|| detect_threats(st.game.position(), &settings.threat_settings(), &mut st.rng));
        let badge = st
            .game
            .take_badge(Instant::now())
            .filter(|_| settings.move_analysis);
        let candidates = st.session.sorted_candidates();

        let view = CycleView {
            position: st.game.position(),
            candidates: &candidates,
            evaluation: st.session.evaluation,
            mate_score: st.session.mate_score,
            progress: st.session.progress_percent(),
            decision: decision.as_ref(),
            badge,
            threats: threats.as_ref(),
        };
        let commands = generate_commands(&view, &settings, &mut st.executor, &mut st.rng);
        drop(guard);

        for command in commands {
            // No receivers simply means no client is connected
            let _ = self.outbound.send(command);
        }
    }

    fn finish(
        &mut self,
        st: &mut AnalysisState,
        done: &FinishedAnalysis,
        settings: &Settings,
    ) -> Option<Decision> {
        self.awaiting_result = false;
        st.game.store_recommendations(&done.candidates);

        let Some(best) = done.best_move.as_deref() else {
            info!(session = done.session_id, "Engine reported no legal move");
            return None;
        };

        let engine = IntelligenceEngine::new(Arc::new(settings.intelligence.clone()))
            .with_maia_primary(self.primary_is_maia());
        let ctx = PositionContext {
            position: st.game.position(),
            move_number: st.game.move_number(),
            current_evaluation: st.game.current_evaluation,
        };
        let outcome = decide(
            &engine,
            done.candidates.clone(),
            best,
            done.evaluation.unwrap_or(0.0),
            &ctx,
            &settings.selection_policy(),
            &mut st.rng,
        );
        st.decisions.record(outcome.decision.clone());
        Some(outcome.decision)
    }

    /// Give up on a session that outlived the ceiling.
    ///
    /// Searching engines are told to stop; their late `bestmove` lands on a
    /// completed session and is ignored. The best candidate so far, if any,
    /// finishes the session.
    fn check_timeout(&mut self, st: &mut AnalysisState) -> Option<FinishedAnalysis> {
        if !self.awaiting_result || !st.session.is_timed_out(self.analysis_timeout) {
            return None;
        }
        self.awaiting_result = false;
        warn!(
            session = st.session.id,
            elapsed_ms = st.session.elapsed().as_millis() as u64,
            candidates = st.session.candidate_count(),
            "Analysis timed out"
        );
        for slot in self.slots.iter_mut().filter(|s| s.searching) {
            slot.process.send("stop");
        }

        let top = st.session.sorted_candidates().into_iter().next()?;
        match st
            .session
            .process_line(&format!("bestmove {}", top.uci), st.game.position())
        {
            SessionEvent::Finished(done) => Some(done),
            _ => None,
        }
    }
}

/// Target depth of a client `go depth N` command
fn go_depth(command: &str) -> Option<u32> {
    let mut tokens = command.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "depth" {
            return tokens.next()?.parse().ok();
        }
    }
    None
}
