//! Position queries the analysis pipeline relies on.
//! Thin layer over shakmaty: legality, classification, attack sets and pins.

use std::sync::LazyLock;

use regex::Regex;
use shakmaty::{
    attacks, fen::Fen, uci::UciMove, Bitboard, CastlingMode, CastlingSide, Chess, Color,
    EnPassantMode, File, Move, Piece, Position, Square,
};
use thiserror::Error;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static UCI_MOVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h][1-8][a-h][1-8][qrnb]?$").expect("static regex"));

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
}

/// Strict coordinate-move syntax check (`e2e4`, `a7a8q`)
pub fn is_uci_syntax(mv: &str) -> bool {
    UCI_MOVE.is_match(mv)
}

/// A validated chess position
#[derive(Clone, Debug)]
pub struct GamePosition {
    pos: Chess,
}

impl Default for GamePosition {
    fn default() -> Self {
        Self::starting()
    }
}

impl GamePosition {
    pub fn starting() -> Self {
        Self {
            pos: Chess::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let parsed: Fen = fen.trim().parse().map_err(|e| RulesError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })?;
        let pos = parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("{e}"),
            })?;
        Ok(Self { pos })
    }

    pub fn chess(&self) -> &Chess {
        &self.pos
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn fullmove_number(&self) -> u32 {
        self.pos.fullmoves().get()
    }

    pub fn piece_count(&self) -> usize {
        self.pos.board().occupied().count()
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.pos.is_stalemate()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.pos.legal_moves().into_iter().collect()
    }

    /// Parse a coordinate move and resolve it against this position.
    /// Returns `None` for malformed or illegal moves.
    pub fn parse_move(&self, uci: &str) -> Option<Move> {
        if !is_uci_syntax(uci) {
            return None;
        }
        let parsed: UciMove = uci.parse().ok()?;
        parsed.to_move(&self.pos).ok()
    }

    pub fn is_legal_uci(&self, uci: &str) -> bool {
        self.parse_move(uci).is_some()
    }

    /// Position after `mv`. `mv` must come from `legal_moves` or `parse_move`.
    pub fn play(&self, mv: &Move) -> GamePosition {
        let mut next = self.pos.clone();
        next.play_unchecked(mv.clone());
        GamePosition { pos: next }
    }

    /// Does `mv` deliver checkmate?
    pub fn gives_mate(&self, mv: &Move) -> bool {
        self.play(mv).is_checkmate()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pos.board().piece_at(square)
    }

    pub fn king_of(&self, color: Color) -> Option<Square> {
        self.pos.board().king_of(color)
    }

    /// Squares attacked by the piece on `square` (empty if none)
    pub fn attacks_from(&self, square: Square) -> Bitboard {
        self.pos.board().attacks_from(square)
    }

    /// Pieces of `color` pinned against their own king by an enemy slider
    pub fn pinned_to_king(&self, color: Color) -> Bitboard {
        let board = self.pos.board();
        let Some(king) = board.king_of(color) else {
            return Bitboard::EMPTY;
        };

        let snipers = ((attacks::rook_attacks(king, Bitboard::EMPTY) & board.rooks_and_queens())
            | (attacks::bishop_attacks(king, Bitboard::EMPTY) & board.bishops_and_queens()))
            & board.by_color(!color);

        let mut pinned = Bitboard::EMPTY;
        for sniper in snipers {
            let blockers = attacks::between(king, sniper) & board.occupied();
            if blockers.count() == 1 && !(blockers & board.by_color(color)).is_empty() {
                pinned |= blockers;
            }
        }
        pinned
    }

    /// Can the side to move legally capture something on `square`?
    pub fn has_recapture_on(&self, square: Square) -> bool {
        self.pos
            .legal_moves()
            .iter()
            .any(|m| m.is_capture() && m.to() == square)
    }

    /// Same piece placement and side to move
    pub fn same_position(&self, other: &GamePosition) -> bool {
        self.pos.board() == other.pos.board() && self.pos.turn() == other.pos.turn()
    }

    /// The single legal move that turns this position into `next`, if any
    pub fn find_move_producing(&self, next: &GamePosition) -> Option<Move> {
        self.legal_moves()
            .into_iter()
            .find(|m| self.play(m).same_position(next))
    }
}

/// Coordinate notation of a move (`e1g1` for castling)
pub fn uci_string(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Origin and destination as a player sees them; castling lands the king on g/c
pub fn display_squares(mv: &Move) -> Option<(Square, Square)> {
    match *mv {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Some((king, Square::from_coords(file, king.rank())))
        }
        _ => Some((mv.from()?, mv.to())),
    }
}

/// Castling side of a castle move; kingside iff the rook sits on a higher file
pub fn castle_side(mv: &Move) -> Option<CastlingSide> {
    match *mv {
        Move::Castle { king, rook } if rook.file() > king.file() => Some(CastlingSide::KingSide),
        Move::Castle { .. } => Some(CastlingSide::QueenSide),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOLS_MATE_SETUP: &str = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";

    #[test]
    fn test_uci_syntax() {
        assert!(is_uci_syntax("e2e4"));
        assert!(is_uci_syntax("a7a8q"));
        assert!(!is_uci_syntax("e2e9"));
        assert!(!is_uci_syntax("a7a8k"));
        assert!(!is_uci_syntax("0000"));
        assert!(!is_uci_syntax("e2e4 "));
    }

    #[test]
    fn test_parse_move_requires_legality() {
        let pos = GamePosition::starting();
        assert!(pos.parse_move("e2e4").is_some());
        assert!(pos.parse_move("e2e5").is_none());
        assert!(pos.parse_move("e7e5").is_none());
    }

    #[test]
    fn test_invalid_fen_is_rejected() {
        assert!(GamePosition::from_fen("not a fen").is_err());
        assert!(GamePosition::from_fen(STARTING_FEN).is_ok());
    }

    #[test]
    fn test_gives_mate() {
        let pos = GamePosition::from_fen(FOOLS_MATE_SETUP).unwrap();
        let mate = pos.parse_move("d8h4").unwrap();
        let quiet = pos.parse_move("d8e7").unwrap();
        assert!(pos.gives_mate(&mate));
        assert!(!pos.gives_mate(&quiet));
    }

    #[test]
    fn test_pinned_to_king() {
        // Black rook on e7 pins the white bishop on e2
        let pos = GamePosition::from_fen("4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1").unwrap();
        let pinned = pos.pinned_to_king(Color::White);
        assert!(pinned.contains(Square::E2));
        assert_eq!(pinned.count(), 1);
        assert!(pos.pinned_to_king(Color::Black).is_empty());
    }

    #[test]
    fn test_find_move_to() {
        let start = GamePosition::starting();
        let after = GamePosition::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        )
        .unwrap();
        let mv = start.find_move_producing(&after).unwrap();
        assert_eq!(uci_string(&mv), "e2e4");
        assert!(after.find_move_producing(&start).is_none());
    }

    #[test]
    fn test_castling_uci_notation() {
        let pos =
            GamePosition::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let castle = pos.parse_move("e1g1").unwrap();
        assert!(castle.is_castle());
        assert_eq!(uci_string(&castle), "e1g1");
        assert_eq!(castle_side(&castle), Some(CastlingSide::KingSide));
        assert_eq!(display_squares(&castle), Some((Square::E1, Square::G1)));

        let long = pos.parse_move("e1c1").unwrap();
        assert_eq!(castle_side(&long), Some(CastlingSide::QueenSide));
        assert_eq!(display_squares(&long), Some((Square::E1, Square::C1)));
    }

    #[test]
    fn test_fen_round_trips_start() {
        assert_eq!(GamePosition::starting().fen(), STARTING_FEN);
    }
}
