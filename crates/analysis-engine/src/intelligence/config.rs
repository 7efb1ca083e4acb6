//! Intelligence settings as they arrive in the settings JSON

use chess_core::shakmaty::{CastlingSide, Role};
use serde::{Deserialize, Serialize};

pub const MIN_THRESHOLD: f64 = -3.0;
pub const MAX_THRESHOLD: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastleSide {
    Kingside,
    Queenside,
}

impl CastleSide {
    pub fn matches(self, side: CastlingSide) -> bool {
        matches!(
            (self, side),
            (CastleSide::Kingside, CastlingSide::KingSide)
                | (CastleSide::Queenside, CastlingSide::QueenSide)
        )
    }
}

/// Re-scoring parameters. Every field has a neutral default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceConfig {
    pub intelligence_enabled: bool,
    pub avoid_low_intelligence: bool,
    pub low_intelligence_threshold: f64,

    pub aggressiveness_contempt: f64,
    pub passiveness_contempt: f64,
    /// Minimum net trade value to reward; 0 disables trade scoring
    pub trading_preference: f64,
    pub capture_preference: f64,
    pub castle_preference: f64,
    pub en_passant_preference: f64,
    pub promotion_preference: f64,

    pub prefer_early_castling: bool,
    pub prefer_pins: bool,
    pub prefer_side_castle: bool,
    pub castle_side: Option<CastleSide>,

    pub pawn_preference: f64,
    pub knight_preference: f64,
    pub bishop_preference: f64,
    pub rook_preference: f64,
    pub queen_preference: f64,
    pub king_preference: f64,

    pub stay_equal: bool,
    pub stalemate_probability: f64,
    pub always_promote_queen: bool,
    pub checkmate_immediately: bool,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            intelligence_enabled: false,
            avoid_low_intelligence: false,
            low_intelligence_threshold: -1.5,
            aggressiveness_contempt: 1.0,
            passiveness_contempt: 1.0,
            trading_preference: 0.0,
            capture_preference: 1.0,
            castle_preference: 1.0,
            en_passant_preference: 1.0,
            promotion_preference: 1.0,
            prefer_early_castling: false,
            prefer_pins: false,
            prefer_side_castle: false,
            castle_side: None,
            pawn_preference: 1.0,
            knight_preference: 1.0,
            bishop_preference: 1.0,
            rook_preference: 1.0,
            queen_preference: 1.0,
            king_preference: 1.0,
            stay_equal: false,
            stalemate_probability: 0.0,
            always_promote_queen: false,
            checkmate_immediately: false,
        }
    }
}

impl IntelligenceConfig {
    /// Avoid-low threshold, always within [-3.0, -1.0]
    pub fn threshold(&self) -> f64 {
        self.low_intelligence_threshold
            .clamp(MIN_THRESHOLD, MAX_THRESHOLD)
    }

    pub fn should_avoid_low(&self) -> bool {
        self.intelligence_enabled && self.avoid_low_intelligence
    }

    pub fn piece_multiplier(&self, role: Role) -> f64 {
        match role {
            Role::Pawn => self.pawn_preference,
            Role::Knight => self.knight_preference,
            Role::Bishop => self.bishop_preference,
            Role::Rook => self.rook_preference,
            Role::Queen => self.queen_preference,
            Role::King => self.king_preference,
        }
    }

    pub fn stalemate_probability(&self) -> f64 {
        self.stalemate_probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IntelligenceConfig = serde_json::from_str(
            r#"{"intelligence_enabled": true, "knight_preference": 1.4, "castle_side": "queenside"}"#,
        )
        .unwrap();
        assert!(config.intelligence_enabled);
        assert_eq!(config.piece_multiplier(Role::Knight), 1.4);
        assert_eq!(config.piece_multiplier(Role::Queen), 1.0);
        assert_eq!(config.castle_side, Some(CastleSide::Queenside));
        assert_eq!(config.threshold(), -1.5);
    }

    #[test]
    fn test_threshold_is_clamped() {
        let mut config = IntelligenceConfig::default();
        config.low_intelligence_threshold = -7.0;
        assert_eq!(config.threshold(), -3.0);
        config.low_intelligence_threshold = 0.5;
        assert_eq!(config.threshold(), -1.0);
    }

    #[test]
    fn test_avoid_low_requires_enabled() {
        let mut config = IntelligenceConfig {
            avoid_low_intelligence: true,
            ..IntelligenceConfig::default()
        };
        assert!(!config.should_avoid_low());
        config.intelligence_enabled = true;
        assert!(config.should_avoid_low());
    }
}
