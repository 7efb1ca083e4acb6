//! Candidate moves reported by an engine, plus the annotations the
//! intelligence layer attaches to them.

use chess_core::shakmaty::{CastlingSide, Move, Role, Square};
use serde::Serialize;

/// Pawn value standing in for a forced mate
pub const FORCED_MATE_PAWNS: f64 = 1000.0;
pub const FORCED_MATE_CP: i32 = 100_000;

/// Centipawn magnitude assigned to engine `mate` scores
pub const MATE_CP: i32 = 10_000;

/// Longest continuation kept per candidate
pub const MAX_PV_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    Mate(i32),
}

impl Score {
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n < 0 => -MATE_CP,
            Score::Mate(_) => MATE_CP,
        }
    }

    pub fn pawns(self) -> f64 {
        f64::from(self.centipawns()) / 100.0
    }

    pub fn mate_in(self) -> Option<i32> {
        match self {
            Score::Mate(n) => Some(n),
            Score::Cp(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    Normal,
    ForcedMate,
}

/// Characteristics of a candidate move in its position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveFeatures {
    pub role: Option<Role>,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_castle: bool,
    pub castle_side: Option<CastlingSide>,
    pub is_en_passant: bool,
    pub is_promotion: bool,
    pub creates_pin: bool,
    pub aggressiveness: i32,
    pub is_trade: bool,
    pub trade_value: i32,
}

impl MoveFeatures {
    pub fn is_aggressive(&self) -> bool {
        self.aggressiveness > 1
    }
}

#[derive(Debug, Clone)]
pub struct MoveCandidate {
    pub mv: Move,
    /// Coordinate notation (`e2e4`, `e1g1`, `a7a8q`)
    pub uci: String,
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
    pub score_cp: Option<i32>,
    pub score_pawns: f64,
    pub depth: u32,
    pub mate_in: Option<i32>,
    pub pv: Vec<String>,
    pub nodes: u64,
    pub pv_index: u32,
    /// Encounter order within the session; breaks score ties
    pub seq: u64,

    pub features: MoveFeatures,
    pub original_pawns: f64,
    pub multiplier: f64,
    pub modified: bool,
    pub status: CandidateStatus,
}

impl MoveCandidate {
    pub fn new(mv: Move, uci: String, from: Square, to: Square) -> Self {
        let promotion = mv.promotion();
        Self {
            mv,
            uci,
            from,
            to,
            promotion,
            score_cp: None,
            score_pawns: 0.0,
            depth: 0,
            mate_in: None,
            pv: Vec::new(),
            nodes: 0,
            pv_index: 1,
            seq: 0,
            features: MoveFeatures::default(),
            original_pawns: 0.0,
            multiplier: 1.0,
            modified: false,
            status: CandidateStatus::Normal,
        }
    }

    pub fn apply_score(&mut self, score: Score) {
        self.score_cp = Some(score.centipawns());
        self.score_pawns = score.pawns();
        self.mate_in = score.mate_in();
    }

    /// Overwrite the pawn score, keeping centipawns in step
    pub fn set_pawns(&mut self, pawns: f64) {
        self.score_pawns = pawns;
        self.score_cp = Some((pawns * 100.0).trunc() as i32);
    }

    pub fn pin_forced_mate(&mut self) {
        self.score_pawns = FORCED_MATE_PAWNS;
        self.score_cp = Some(FORCED_MATE_CP);
        self.status = CandidateStatus::ForcedMate;
    }

    pub fn is_forced_mate(&self) -> bool {
        self.status == CandidateStatus::ForcedMate
    }

    pub fn promotion_char(&self) -> Option<char> {
        self.promotion.map(|r| r.char())
    }
}

/// Stable sort, best first
pub fn sort_by_score(candidates: &mut [MoveCandidate]) {
    candidates.sort_by(|a, b| b.score_pawns.total_cmp(&a.score_pawns));
}
