//! Hard overrides and filters applied after multiplier scoring

use chess_core::shakmaty::{Move, Role};
use chess_core::GamePosition;
use rand::Rng;
use tracing::info;

use crate::candidate::MoveCandidate;

/// Moves (not plies) searched for a forced mate: mate-in-3, five plies
pub const MATE_SEARCH_MOVES: u32 = 3;

pub const STALEMATE_BOOST_PAWNS: f64 = 50.0;

/// Tracked evaluation above which stay-equal filtering starts
pub const STAY_EQUAL_TRIGGER: f64 = 1.5;
const STAY_EQUAL_FLOOR: f64 = 0.5;
const STAY_EQUAL_MARGIN: f64 = 0.3;

/// First move forcing mate within `moves` of our moves
pub fn find_forced_mate(position: &GamePosition, moves: u32) -> Option<Move> {
    if moves == 0 {
        return None;
    }
    position
        .legal_moves()
        .into_iter()
        .find(|mv| forces_mate(position, mv, moves))
}

fn forces_mate(position: &GamePosition, mv: &Move, moves: u32) -> bool {
    let after = position.play(mv);
    if after.is_checkmate() {
        return true;
    }
    if moves <= 1 {
        return false;
    }
    let replies = after.legal_moves();
    // No replies without mate is stalemate
    !replies.is_empty()
        && replies
            .iter()
            .all(|reply| find_forced_mate(&after.play(reply), moves - 1).is_some())
}

/// Pin the candidate playing the shortest forced mate, if the engine listed it
pub fn boost_forced_mate(candidates: &mut [MoveCandidate], position: &GamePosition) {
    let Some(mate) = (1..=MATE_SEARCH_MOVES).find_map(|moves| find_forced_mate(position, moves))
    else {
        return;
    };
    if let Some(candidate) = candidates.iter_mut().find(|c| c.mv == mate) {
        info!(mv = %candidate.uci, "Forced mate found");
        candidate.pin_forced_mate();
    }
}

/// Boost stalemating moves, each with probability `probability`
pub fn boost_stalemates<R: Rng + ?Sized>(
    candidates: &mut [MoveCandidate],
    position: &GamePosition,
    probability: f64,
    rng: &mut R,
) {
    if probability <= 0.0 {
        return;
    }
    for candidate in candidates.iter_mut() {
        if position.play(&candidate.mv).is_stalemate() && rng.random::<f64>() < probability {
            info!(mv = %candidate.uci, "Stalemate boosted");
            candidate.set_pawns(STALEMATE_BOOST_PAWNS);
        }
    }
}

/// Drop underpromotions. Leaves the list alone if nothing would remain.
pub fn keep_queen_promotions(candidates: Vec<MoveCandidate>) -> Vec<MoveCandidate> {
    let filtered: Vec<MoveCandidate> = candidates
        .iter()
        .filter(|c| matches!(c.promotion, None | Some(Role::Queen)))
        .cloned()
        .collect();
    if filtered.is_empty() {
        candidates
    } else {
        filtered
    }
}

/// When clearly ahead, keep only moves that stay modestly ahead.
/// Leaves the list alone if nothing would remain.
pub fn stay_equal(candidates: Vec<MoveCandidate>, current_eval: f64) -> Vec<MoveCandidate> {
    if current_eval <= STAY_EQUAL_TRIGGER {
        return candidates;
    }
    let ceiling = current_eval - STAY_EQUAL_MARGIN;
    let filtered: Vec<MoveCandidate> = candidates
        .iter()
        .filter(|c| c.score_pawns > STAY_EQUAL_FLOOR && c.score_pawns < ceiling)
        .cloned()
        .collect();
    if filtered.is_empty() {
        candidates
    } else {
        info!(kept = filtered.len(), "Stay-equal filter applied");
        filtered
    }
}
