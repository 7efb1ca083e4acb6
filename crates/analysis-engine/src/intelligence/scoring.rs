//! Candidate re-scoring
//!
//! Order matters: forced mates are pinned first and exempt from everything
//! after; multipliers come next; special behaviors run last and may override
//! or filter; the result is sorted best first.

use std::sync::Arc;

use chess_core::GamePosition;
use rand::Rng;
use tracing::{debug, info};

use super::config::IntelligenceConfig;
use super::features::extract_features;
use super::multiplier::apply_multiplier;
use super::special;
use crate::candidate::{sort_by_score, MoveCandidate};

pub const EARLY_CASTLE_BONUS: f64 = 1.2;
/// Last move number that counts as early for castling
pub const EARLY_CASTLE_MOVES: u32 = 15;
pub const CASTLE_SIDE_BONUS: f64 = 1.2;
pub const PIN_BONUS: f64 = 1.1;
pub const TRADE_REWARD: f64 = 1.5;
pub const TRADE_PENALTY: f64 = 0.5;

/// Product deviation below which a candidate's score is left untouched
const SIGNIFICANT_CHANGE: f64 = 0.01;

/// What the scorer needs to know about the game besides the board
#[derive(Debug, Clone, Copy)]
pub struct PositionContext<'a> {
    pub position: &'a GamePosition,
    pub move_number: u32,
    /// Last tracked evaluation in pawns
    pub current_evaluation: f64,
}

/// In check, nearly forced, or a mate is available
pub fn is_critical_position(position: &GamePosition) -> bool {
    if position.is_check() {
        return true;
    }
    let moves = position.legal_moves();
    moves.len() <= 2 || moves.iter().any(|mv| position.gives_mate(mv))
}

/// Running evaluation and multiplier product for one candidate
struct Accumulator {
    eval: f64,
    product: f64,
    critical: bool,
}

impl Accumulator {
    fn new(eval: f64, critical: bool) -> Self {
        Self {
            eval,
            product: 1.0,
            critical,
        }
    }

    fn apply(&mut self, multiplier: f64) {
        if multiplier == 1.0 {
            return;
        }
        self.eval = apply_multiplier(self.eval, multiplier, self.critical);
        self.product *= multiplier;
    }
}

pub struct IntelligenceEngine {
    config: Arc<IntelligenceConfig>,
    maia_primary: bool,
}

impl IntelligenceEngine {
    pub fn new(config: Arc<IntelligenceConfig>) -> Self {
        Self {
            config,
            maia_primary: false,
        }
    }

    /// Maia engines play human-like moves; their candidates are never re-scored
    pub fn with_maia_primary(mut self, maia_primary: bool) -> Self {
        self.maia_primary = maia_primary;
        self
    }

    pub fn config(&self) -> &IntelligenceConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.config.intelligence_enabled && !self.maia_primary
    }

    /// Re-score and re-rank `candidates`. Returns them untouched when inactive.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        mut candidates: Vec<MoveCandidate>,
        ctx: &PositionContext<'_>,
        rng: &mut R,
    ) -> Vec<MoveCandidate> {
        if !self.is_active() || candidates.is_empty() {
            return candidates;
        }

        let position = ctx.position;
        for candidate in candidates.iter_mut() {
            if position.gives_mate(&candidate.mv) {
                info!(mv = %candidate.uci, "Mating candidate pinned");
                candidate.pin_forced_mate();
            }
        }

        let critical = is_critical_position(position);
        if critical {
            debug!("Critical position, damping multipliers");
        }

        for candidate in candidates.iter_mut().filter(|c| !c.is_forced_mate()) {
            self.score_candidate(candidate, ctx, critical);
        }

        let config = &self.config;
        if config.checkmate_immediately {
            special::boost_forced_mate(&mut candidates, position);
        }
        special::boost_stalemates(
            &mut candidates,
            position,
            config.stalemate_probability(),
            rng,
        );
        if config.always_promote_queen {
            candidates = special::keep_queen_promotions(candidates);
        }
        if config.stay_equal {
            candidates = special::stay_equal(candidates, ctx.current_evaluation);
        }

        sort_by_score(&mut candidates);
        candidates
    }

    fn score_candidate(&self, candidate: &mut MoveCandidate, ctx: &PositionContext<'_>, critical: bool) {
        let config = &self.config;
        let features = extract_features(ctx.position, &candidate.mv);
        candidate.original_pawns = candidate.score_pawns;

        let mut acc = Accumulator::new(candidate.score_pawns, critical);

        if let Some(role) = features.role {
            acc.apply(config.piece_multiplier(role));
        }

        if features.is_aggressive() {
            acc.apply(config.aggressiveness_contempt);
        } else {
            acc.apply(config.passiveness_contempt);
        }

        if features.is_capture {
            acc.apply(config.capture_preference);
        }

        if features.is_castle {
            acc.apply(config.castle_preference);
            if config.prefer_early_castling && ctx.move_number <= EARLY_CASTLE_MOVES {
                acc.apply(EARLY_CASTLE_BONUS);
            }
            if config.prefer_side_castle {
                let wanted = config.castle_side.zip(features.castle_side);
                if wanted.is_some_and(|(pref, side)| pref.matches(side)) {
                    acc.apply(CASTLE_SIDE_BONUS);
                }
            }
        }

        if features.is_en_passant {
            acc.apply(config.en_passant_preference);
        }

        if features.is_promotion {
            acc.apply(config.promotion_preference);
        }

        if features.creates_pin && config.prefer_pins {
            acc.apply(PIN_BONUS);
        }

        if features.is_trade && config.trading_preference != 0.0 {
            if f64::from(features.trade_value) >= config.trading_preference {
                acc.apply(TRADE_REWARD);
            } else {
                acc.apply(TRADE_PENALTY);
            }
        }

        debug!(
            mv = %candidate.uci,
            original = candidate.original_pawns,
            modified = acc.eval,
            multiplier = acc.product,
            "Candidate scored"
        );

        candidate.features = features;
        candidate.multiplier = acc.product;
        if (acc.product - 1.0).abs() > SIGNIFICANT_CHANGE {
            candidate.set_pawns(acc.eval);
            candidate.modified = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{FORCED_MATE_CP, FORCED_MATE_PAWNS};
    use chess_core::display_squares;
    use rand::{rngs::StdRng, SeedableRng};

    fn candidate(pos: &GamePosition, uci: &str, pawns: f64) -> MoveCandidate {
        let mv = pos.parse_move(uci).unwrap();
        let (from, to) = display_squares(&mv).unwrap();
        let mut c = MoveCandidate::new(mv, uci.to_string(), from, to);
        c.set_pawns(pawns);
        c
    }

    fn engine(config: IntelligenceConfig) -> IntelligenceEngine {
        IntelligenceEngine::new(Arc::new(config))
    }

    fn enabled() -> IntelligenceConfig {
        IntelligenceConfig {
            intelligence_enabled: true,
            ..IntelligenceConfig::default()
        }
    }

    #[test]
    fn test_disabled_returns_input_unchanged() {
        let pos = GamePosition::starting();
        let input = vec![candidate(&pos, "d2d4", 0.2), candidate(&pos, "e2e4", 0.3)];
        let config = IntelligenceConfig {
            knight_preference: 3.0,
            ..IntelligenceConfig::default()
        };
        let ctx = PositionContext {
            position: &pos,
            move_number: 1,
            current_evaluation: 0.0,
        };
        let out = engine(config).apply(input, &ctx, &mut StdRng::seed_from_u64(0));
        let order: Vec<_> = out.iter().map(|c| (c.uci.as_str(), c.score_pawns)).collect();
        assert_eq!(order, vec![("d2d4", 0.2), ("e2e4", 0.3)]);
    }

    #[test]
    fn test_maia_primary_skips_rescoring() {
        let pos = GamePosition::starting();
        let input = vec![candidate(&pos, "g1f3", 0.2)];
        let config = IntelligenceConfig {
            knight_preference: 3.0,
            ..enabled()
        };
        let ctx = PositionContext {
            position: &pos,
            move_number: 1,
            current_evaluation: 0.0,
        };
        let out = engine(config)
            .with_maia_primary(true)
            .apply(input, &ctx, &mut StdRng::seed_from_u64(0));
        assert_eq!(out[0].score_pawns, 0.2);
        assert!(!out[0].modified);
    }

    #[test]
    fn test_piece_preference_reranks() {
        let pos = GamePosition::starting();
        let input = vec![candidate(&pos, "e2e4", 0.4), candidate(&pos, "g1f3", 0.3)];
        let config = IntelligenceConfig {
            knight_preference: 2.0,
            ..enabled()
        };
        let ctx = PositionContext {
            position: &pos,
            move_number: 1,
            current_evaluation: 0.0,
        };
        let out = engine(config).apply(input, &ctx, &mut StdRng::seed_from_u64(0));
        assert_eq!(out[0].uci, "g1f3");
        assert!((out[0].score_pawns - 0.6).abs() < 1e-9);
        assert_eq!(out[0].score_cp, Some(60));
        assert!(out[0].modified);
        assert_eq!(out[0].original_pawns, 0.3);
        assert!(!out[1].modified);
    }

    #[test]
    fn test_mating_move_ignores_multipliers() {
        let pos = GamePosition::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let input = vec![candidate(&pos, "g1f1", 0.5), candidate(&pos, "a1a8", 7.0)];
        let config = IntelligenceConfig {
            rook_preference: 0.1,
            ..enabled()
        };
        let ctx = PositionContext {
            position: &pos,
            move_number: 30,
            current_evaluation: 5.0,
        };
        let out = engine(config).apply(input, &ctx, &mut StdRng::seed_from_u64(0));
        assert_eq!(out[0].uci, "a1a8");
        assert_eq!(out[0].score_pawns, FORCED_MATE_PAWNS);
        assert_eq!(out[0].score_cp, Some(FORCED_MATE_CP));
        assert!(out[0].is_forced_mate());
    }

    #[test]
    fn test_critical_position_detection() {
        assert!(!is_critical_position(&GamePosition::starting()));
        let mate_available =
            GamePosition::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        assert!(is_critical_position(&mate_available));
    }

    #[test]
    fn test_checkmate_immediately_pins_mate_in_two() {
        let pos = GamePosition::from_fen("7k/8/8/8/8/8/R7/1R4K1 w - - 0 1").unwrap();
        let mate = special::find_forced_mate(&pos, 2).unwrap();
        let mate_uci = chess_core::uci_string(&mate);
        let other = if mate_uci == "g1f1" { "g1h1" } else { "g1f1" };

        let input = vec![candidate(&pos, other, 6.0), candidate(&pos, &mate_uci, 5.0)];
        let config = IntelligenceConfig {
            checkmate_immediately: true,
            ..enabled()
        };
        let ctx = PositionContext {
            position: &pos,
            move_number: 40,
            current_evaluation: 6.0,
        };
        let out = engine(config).apply(input, &ctx, &mut StdRng::seed_from_u64(0));
        assert_eq!(out[0].uci, mate_uci);
        assert!(out[0].is_forced_mate());
    }
}
