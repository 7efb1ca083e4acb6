//! Tracked game: current position, phase, history and the post-move badge

use std::time::{Duration, Instant};

use analysis_engine::MoveCandidate;
use chess_core::{uci_string, GamePosition, RulesError, STARTING_FEN};
use serde::Serialize;
use tracing::info;

use crate::protocol::EffectKind;

const OPENING_MOVES: u32 = 12;
const ENDGAME_PIECES: usize = 12;
const HISTORY_LIMIT: usize = 50;
const HISTORY_KEEP: usize = 25;
pub const BADGE_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    fn classify(move_number: u32, pieces: usize) -> Self {
        if move_number <= OPENING_MOVES {
            GamePhase::Opening
        } else if pieces <= ENDGAME_PIECES {
            GamePhase::Endgame
        } else {
            GamePhase::Middlegame
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub square: String,
    pub kind: EffectKind,
    pub color: &'static str,
}

impl Badge {
    /// Badge for the move ranked `rank` (1-based) among the recommendations
    pub fn for_rank(rank: Option<usize>, square: String) -> Self {
        let (kind, color) = match rank {
            Some(1) => (EffectKind::BestMove, "#0080ff"),
            Some(2) => (EffectKind::Excellent, "#00ff00"),
            Some(3) => (EffectKind::Good, "#81c678"),
            Some(4 | 5) => (EffectKind::Good, "#ffff00"),
            Some(_) => (EffectKind::Inaccuracy, "#ff6600"),
            None => (EffectKind::Mistake, "#ff0000"),
        };
        Self {
            square,
            kind,
            color,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingBadge {
    square: String,
    rank: Option<usize>,
    since: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionUpdate {
    NewGame,
    Updated { played: Option<String> },
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub fen: String,
    pub move_number: u32,
    pub phase: GamePhase,
    pub pieces: usize,
}

#[derive(Debug)]
pub struct GameState {
    position: GamePosition,
    fen: String,
    move_number: u32,
    phase: GamePhase,
    history: Vec<String>,
    /// Moves recommended for the current position, best first
    recommendations: Vec<String>,
    pending_badge: Option<PendingBadge>,
    /// Latest top-line evaluation in pawns
    pub current_evaluation: f64,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        let position = GamePosition::starting();
        Self {
            move_number: position.fullmove_number(),
            phase: GamePhase::Opening,
            fen: STARTING_FEN.to_string(),
            position,
            history: Vec::new(),
            recommendations: Vec::new(),
            pending_badge: None,
            current_evaluation: 0.0,
        }
    }

    pub fn position(&self) -> &GamePosition {
        &self.position
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            fen: self.fen.clone(),
            move_number: self.move_number,
            phase: self.phase,
            pieces: self.position.piece_count(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Adopt a reported position.
    ///
    /// The starting position reported while another position is tracked
    /// starts a new game. Otherwise the move that connects the previous
    /// position to this one is detected and, when recommendations exist for
    /// the previous position, queued for a badge.
    pub fn update_position(&mut self, fen: &str) -> Result<PositionUpdate, RulesError> {
        let fen = fen.trim();
        let next = GamePosition::from_fen(fen)?;

        if fen == STARTING_FEN && self.fen != STARTING_FEN {
            info!("New game detected");
            self.reset();
            return Ok(PositionUpdate::NewGame);
        }
        if fen == self.fen {
            return Ok(PositionUpdate::Unchanged);
        }

        let played = self
            .position
            .find_move_producing(&next)
            .map(|mv| uci_string(&mv));
        if let Some(mv) = &played {
            if !self.recommendations.is_empty() {
                self.pending_badge = mv.get(2..4).map(|square| PendingBadge {
                    square: square.to_string(),
                    rank: self.recommendations.iter().position(|m| m == mv).map(|i| i + 1),
                    since: Instant::now(),
                });
            }
        }

        self.move_number = next.fullmove_number();
        self.phase = GamePhase::classify(self.move_number, next.piece_count());
        self.position = next;
        self.fen = fen.to_string();
        self.recommendations.clear();

        self.history.push(self.fen.clone());
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_KEEP;
            self.history.drain(..excess);
        }

        Ok(PositionUpdate::Updated { played })
    }

    /// Remember the finished analysis for the current position
    pub fn store_recommendations(&mut self, ranked: &[MoveCandidate]) {
        self.recommendations = ranked.iter().map(|c| c.uci.clone()).collect();
    }

    /// Badge for the last played move, consumed on read. Expired badges are dropped.
    pub fn take_badge(&mut self, now: Instant) -> Option<Badge> {
        let pending = self.pending_badge.take()?;
        if now.saturating_duration_since(pending.since) > BADGE_LIFETIME {
            return None;
        }
        Some(Badge::for_rank(pending.rank, pending.square))
    }

    pub fn has_pending_badge(&self) -> bool {
        self.pending_badge.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::display_squares;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    const AFTER_D4: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";

    fn candidates(position: &GamePosition, moves: &[&str]) -> Vec<MoveCandidate> {
        moves
            .iter()
            .map(|uci| {
                let mv = position.parse_move(uci).unwrap();
                let (from, to) = display_squares(&mv).unwrap();
                MoveCandidate::new(mv, uci.to_string(), from, to)
            })
            .collect()
    }

    #[test]
    fn test_badge_ranks() {
        assert_eq!(Badge::for_rank(Some(1), "e4".into()).kind, EffectKind::BestMove);
        assert_eq!(Badge::for_rank(Some(2), "e4".into()).color, "#00ff00");
        assert_eq!(Badge::for_rank(Some(4), "e4".into()).kind, EffectKind::Good);
        assert_eq!(Badge::for_rank(Some(5), "e4".into()).color, "#ffff00");
        assert_eq!(Badge::for_rank(Some(6), "e4".into()).kind, EffectKind::Inaccuracy);
        assert_eq!(Badge::for_rank(None, "e4".into()).kind, EffectKind::Mistake);
    }

    #[test]
    fn test_played_move_gets_badge_from_previous_recommendations() {
        let mut game = GameState::new();
        let recs = candidates(game.position(), &["d2d4", "e2e4", "g1f3"]);
        game.store_recommendations(&recs);

        let update = game.update_position(AFTER_E4).unwrap();
        assert_eq!(
            update,
            PositionUpdate::Updated {
                played: Some("e2e4".into())
            }
        );
        assert!(game.recommendations().is_empty());

        let badge = game.take_badge(Instant::now()).unwrap();
        assert_eq!(badge.square, "e4");
        assert_eq!(badge.kind, EffectKind::Excellent);
        // Consumed
        assert!(game.take_badge(Instant::now()).is_none());
    }

    #[test]
    fn test_badge_expires() {
        let mut game = GameState::new();
        let recs = candidates(game.position(), &["e2e4"]);
        game.store_recommendations(&recs);
        game.update_position(AFTER_D4).unwrap();
        assert!(game.has_pending_badge());

        let later = Instant::now() + BADGE_LIFETIME + Duration::from_millis(10);
        assert!(game.take_badge(later).is_none());
        assert!(!game.has_pending_badge());
    }

    #[test]
    fn test_no_badge_without_recommendations() {
        let mut game = GameState::new();
        game.update_position(AFTER_E4).unwrap();
        assert!(!game.has_pending_badge());
    }

    #[test]
    fn test_start_fen_resets_game() {
        let mut game = GameState::new();
        game.update_position(AFTER_E4).unwrap();
        assert_eq!(game.history().len(), 1);
        game.current_evaluation = 0.4;

        assert_eq!(game.update_position(STARTING_FEN).unwrap(), PositionUpdate::NewGame);
        assert_eq!(game.fen(), STARTING_FEN);
        assert!(game.history().is_empty());
        assert_eq!(game.current_evaluation, 0.0);

        assert_eq!(
            game.update_position(STARTING_FEN).unwrap(),
            PositionUpdate::Unchanged
        );
    }

    #[test]
    fn test_phase_classification() {
        assert_eq!(GamePhase::classify(12, 32), GamePhase::Opening);
        assert_eq!(GamePhase::classify(13, 20), GamePhase::Middlegame);
        assert_eq!(GamePhase::classify(40, 12), GamePhase::Endgame);
    }

    #[test]
    fn test_invalid_fen_is_rejected() {
        let mut game = GameState::new();
        assert!(game.update_position("not a fen").is_err());
        assert_eq!(game.fen(), STARTING_FEN);
    }
}
