//! Final move choice and the rolling decision log

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use super::scoring::{IntelligenceEngine, PositionContext};
use crate::candidate::MoveCandidate;

/// History length that triggers trimming
const HISTORY_LIMIT: usize = 100;
/// Entries kept after trimming
const HISTORY_KEEP: usize = 50;
/// Entries reported by [`DecisionLog::stats`]
const RECENT_DECISIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Used,
    Avoided,
    Disabled,
    Failed,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionKind::Used => "used",
            DecisionKind::Avoided => "avoided",
            DecisionKind::Disabled => "disabled",
            DecisionKind::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub selected_move: String,
    #[serde(rename = "decision")]
    pub kind: DecisionKind,
    pub reason: String,
    pub engine_move: String,
    pub engine_eval: f64,
    pub intelligence_eval: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// How the final move is picked among re-ranked candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    /// Percent chance of the top move; 100 or more always picks it
    pub best_move_chance: f64,
}

impl SelectionPolicy {
    pub fn always_best() -> Self {
        Self {
            best_move_chance: 100.0,
        }
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            best_move_chance: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub decision: Decision,
    /// Candidates in the order the decision saw them
    pub ranked: Vec<MoveCandidate>,
}

/// Percent weights per rank: the top gets `chance`, each later rank half the
/// weight of the one before it, and the last rank absorbs what is left
pub fn selection_weights(count: usize, chance: f64) -> Vec<f64> {
    match count {
        0 => return Vec::new(),
        1 => return vec![100.0],
        _ => {}
    }

    let chance = chance.clamp(0.0, 100.0);
    let mut weights = Vec::with_capacity(count);
    weights.push(chance);
    let mut remaining = 100.0 - chance;

    for i in 1..count {
        if i == count - 1 {
            weights.push(remaining);
            break;
        }
        let weight = 0.5f64.powi(i as i32);
        let pool: f64 = (i..count).map(|j| 0.5f64.powi(j as i32)).sum();
        let share = weight / pool * remaining;
        weights.push(share);
        remaining -= share;
    }

    weights
}

/// Index of the rank chosen by one draw against the cumulative weights
pub fn select_index<R: Rng + ?Sized>(count: usize, chance: f64, rng: &mut R) -> usize {
    if count <= 1 || chance >= 100.0 {
        return 0;
    }
    let draw = rng.random::<f64>() * 100.0;
    let mut cumulative = 0.0;
    for (i, weight) in selection_weights(count, chance).into_iter().enumerate() {
        cumulative += weight;
        if draw <= cumulative {
            return i;
        }
    }
    0
}

fn decision(
    selected: &str,
    kind: DecisionKind,
    reason: String,
    engine_move: &str,
    engine_eval: f64,
    intelligence_eval: Option<f64>,
) -> Decision {
    Decision {
        selected_move: selected.to_string(),
        kind,
        reason,
        engine_move: engine_move.to_string(),
        engine_eval,
        intelligence_eval,
        timestamp: Utc::now(),
    }
}

/// Choose the move to play for a finished search.
///
/// `candidates` are the engine's, best first; `engine_move` is its `bestmove`.
pub fn decide<R: Rng + ?Sized>(
    engine: &IntelligenceEngine,
    candidates: Vec<MoveCandidate>,
    engine_move: &str,
    engine_eval: f64,
    ctx: &PositionContext<'_>,
    policy: &SelectionPolicy,
    rng: &mut R,
) -> DecisionOutcome {
    let config = engine.config();

    if !config.intelligence_enabled {
        return DecisionOutcome {
            decision: decision(
                engine_move,
                DecisionKind::Disabled,
                "Intelligence disabled in settings".into(),
                engine_move,
                engine_eval,
                None,
            ),
            ranked: candidates,
        };
    }

    if candidates.is_empty() {
        warn!(engine_move, "No candidates available for intelligence");
        return DecisionOutcome {
            decision: decision(
                engine_move,
                DecisionKind::Failed,
                "No candidates available for intelligence".into(),
                engine_move,
                engine_eval,
                None,
            ),
            ranked: candidates,
        };
    }

    let ranked = engine.apply(candidates, ctx, rng);
    let Some(top) = ranked.first() else {
        warn!(engine_move, "Intelligence produced no candidates");
        return DecisionOutcome {
            decision: decision(
                engine_move,
                DecisionKind::Failed,
                "Intelligence processing produced no candidates".into(),
                engine_move,
                engine_eval,
                None,
            ),
            ranked,
        };
    };

    let intel_eval = top.score_pawns;
    let threshold = config.threshold();
    if config.should_avoid_low() && intel_eval <= threshold {
        info!(intel_eval, threshold, "Intelligence avoided");
        let d = decision(
            engine_move,
            DecisionKind::Avoided,
            format!("Intelligence eval {intel_eval:.2} <= threshold {threshold:.2}"),
            engine_move,
            engine_eval,
            Some(intel_eval),
        );
        return DecisionOutcome { decision: d, ranked };
    }

    // A Maia primary reaches here with its candidates unscored
    let index = select_index(ranked.len(), policy.best_move_chance, rng);
    let selected = ranked[index].uci.clone();
    info!(engine_move, selected = %selected, rank = index + 1, "Intelligence used");

    let d = decision(
        &selected,
        DecisionKind::Used,
        format!("Intelligence move: {selected}, eval: {intel_eval:.2}"),
        engine_move,
        engine_eval,
        Some(intel_eval),
    );
    DecisionOutcome { decision: d, ranked }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionStats {
    pub total_decisions: u64,
    pub intelligence_used: u64,
    pub intelligence_avoided: u64,
    pub intelligence_disabled: u64,
    pub intelligence_failed: u64,
    pub usage_rate: f64,
    pub avoidance_rate: f64,
    pub recent_decisions: Vec<Decision>,
}

#[derive(Debug, Default)]
pub struct DecisionLog {
    total: u64,
    used: u64,
    avoided: u64,
    disabled: u64,
    failed: u64,
    history: Vec<Decision>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, decision: Decision) {
        self.total += 1;
        match decision.kind {
            DecisionKind::Used => self.used += 1,
            DecisionKind::Avoided => self.avoided += 1,
            DecisionKind::Disabled => self.disabled += 1,
            DecisionKind::Failed => self.failed += 1,
        }
        info!(
            decision = %decision.kind,
            engine_move = %decision.engine_move,
            selected = %decision.selected_move,
            reason = %decision.reason,
            "Move decision"
        );
        self.history.push(decision);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_KEEP;
            self.history.drain(..excess);
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn stats(&self) -> DecisionStats {
        let rate = |n: u64| {
            if self.total == 0 {
                0.0
            } else {
                n as f64 / self.total as f64 * 100.0
            }
        };
        let recent_start = self.history.len().saturating_sub(RECENT_DECISIONS);
        DecisionStats {
            total_decisions: self.total,
            intelligence_used: self.used,
            intelligence_avoided: self.avoided,
            intelligence_disabled: self.disabled,
            intelligence_failed: self.failed,
            usage_rate: rate(self.used),
            avoidance_rate: rate(self.avoided),
            recent_decisions: self.history[recent_start..].to_vec(),
        }
    }
}
