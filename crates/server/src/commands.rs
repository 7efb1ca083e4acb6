//! Turns one analysis cycle into wire commands

use analysis_engine::intelligence::{Decision, DecisionKind};
use analysis_engine::{MoveCandidate, ThreatRecord, ThreatReport};
use chess_core::GamePosition;
use rand::Rng;
use tracing::{debug, warn};

use crate::executor::MoveExecutor;
use crate::game_state::Badge;
use crate::protocol::{Arrow, Effect, EvalValue, VisualUpdate, WireCommand, MAX_ARROWS};
use crate::settings::Settings;

/// Hint arrow style per engine rank
const HINT_STYLES: [(&str, f64); 5] = [
    ("#0080ff", 0.8),
    ("#00ff00", 0.7),
    ("#81c678", 0.6),
    ("#ffff00", 0.5),
    ("#ff6600", 0.4),
];

const PLAYER_THREAT: (&str, f64) = ("#00ff00", 0.2);
const OPPONENT_THREAT: (&str, f64) = ("#ff0000", 0.2);

/// Player threats along the selected move are hidden when the move evaluates below this
const SELECTED_THREAT_FLOOR: f64 = -2.0;

/// Everything one cycle knows about the current analysis
pub struct CycleView<'a> {
    pub position: &'a GamePosition,
    /// Engine candidates, best first
    pub candidates: &'a [MoveCandidate],
    pub evaluation: Option<f64>,
    pub mate_score: Option<i32>,
    pub progress: f64,
    pub decision: Option<&'a Decision>,
    pub badge: Option<Badge>,
    pub threats: Option<&'a ThreatReport>,
}

fn selected_style(kind: DecisionKind) -> Option<&'static str> {
    match kind {
        DecisionKind::Used => Some("#ff00ff"),
        DecisionKind::Avoided => Some("#3f00ff"),
        DecisionKind::Disabled => Some("#0080ff"),
        DecisionKind::Failed => None,
    }
}

fn hint_arrows(view: &CycleView<'_>, settings: &Settings) -> Vec<Arrow> {
    if !settings.show_hints {
        return Vec::new();
    }
    let limit = view.candidates.len().min(settings.hint_limit());
    let selected = view
        .decision
        .and_then(|d| selected_style(d.kind).map(|color| (d.selected_move.as_str(), color)));

    view.candidates[..limit]
        .iter()
        .zip(HINT_STYLES)
        .map(|(candidate, (color, opacity))| {
            let from = candidate.from.to_string();
            let to = candidate.to.to_string();
            match selected {
                Some((uci, color)) if uci == candidate.uci => Arrow::new(from, to, color, 1.0),
                _ => Arrow::new(from, to, color, opacity),
            }
        })
        .collect()
}

fn threat_arrow(threat: &ThreatRecord, (color, opacity): (&str, f64)) -> Arrow {
    Arrow::new(threat.from.to_string(), threat.to.to_string(), color, opacity)
}

fn threat_arrows(view: &CycleView<'_>, settings: &Settings) -> Vec<Arrow> {
    let Some(report) = view.threats.filter(|_| settings.show_threat_arrows) else {
        return Vec::new();
    };

    // A losing selected move should not be advertised as a threat
    let hidden = view.decision.and_then(|d| {
        view.candidates
            .iter()
            .find(|c| c.uci == d.selected_move && c.score_pawns < SELECTED_THREAT_FLOOR)
            .map(|c| (c.from, c.to))
    });

    report
        .player
        .iter()
        .filter(|t| hidden != Some((t.from, t.to)))
        .map(|t| threat_arrow(t, PLAYER_THREAT))
        .chain(report.opponent.iter().map(|t| threat_arrow(t, OPPONENT_THREAT)))
        .collect()
}

fn visual_update(view: &CycleView<'_>, settings: &Settings) -> VisualUpdate {
    let hints = hint_arrows(view, settings);
    let mut threats = threat_arrows(view, settings);
    threats.truncate(MAX_ARROWS.saturating_sub(hints.len()));

    let effects = view
        .badge
        .iter()
        .map(|badge| Effect {
            square: badge.square.clone(),
            kind: badge.kind,
            color: badge.color.to_string(),
        })
        .collect();

    VisualUpdate {
        arrows: threats.into_iter().chain(hints).collect(),
        highlights: Vec::new(),
        effects,
    }
}

fn push(out: &mut Vec<String>, command: WireCommand) {
    match command.render() {
        Ok(line) => out.push(line),
        Err(e) => warn!(command = command.name(), error = %e, "Suppressed invalid command"),
    }
}

/// Commands for one cycle, in emission order
pub fn generate_commands<R: Rng + ?Sized>(
    view: &CycleView<'_>,
    settings: &Settings,
    executor: &mut MoveExecutor,
    rng: &mut R,
) -> Vec<String> {
    let mut out = Vec::new();

    let visual = visual_update(view, settings);
    if !visual.is_empty() {
        push(&mut out, WireCommand::Visual(visual));
    }

    if settings.evaluation_bar {
        let value = match (view.mate_score, view.evaluation) {
            (Some(mate), _) => Some(EvalValue::Mate(mate)),
            (None, Some(pawns)) => Some(EvalValue::Pawns(pawns)),
            (None, None) => None,
        };
        if let Some(value) = value {
            push(&mut out, WireCommand::Evaluation(value));
        }
    }

    if settings.depth_bar {
        push(&mut out, WireCommand::Depth(view.progress));
    }

    if let Some(decision) = view.decision {
        if settings.legit_auto_move {
            if view.position.is_legal_uci(&decision.selected_move) {
                let (delay, timing) = executor.next_delay(settings, rng);
                debug!(mv = %decision.selected_move, delay, ?timing, "Scheduling move");
                push(
                    &mut out,
                    WireCommand::Move {
                        uci: decision.selected_move.clone(),
                        delay_ms: Some(delay),
                    },
                );
            } else {
                warn!(mv = %decision.selected_move, "Selected move is not legal here");
            }
        }
        push(&mut out, WireCommand::Depth(100.0));
    }

    out
}
