//! Threat detection for board annotations
//!
//! Player threats look at every legal move for the side to move; opponent
//! threats are what the other side attacks right now. Both lists are
//! deduplicated per (from, to), ranked by strength and truncated.

use chess_core::shakmaty::{Position, Role, Square};
use chess_core::{display_squares, threat_value, GamePosition};
use rand::Rng;

/// Value attached to a move that gives check
const CHECK_VALUE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatKind {
    Capture,
    Check,
    CheckThreat,
    DiscoveredAttack,
    NewAttack,
    Attack,
    Fork,
    Pin,
    Skewer,
    Checkmate,
    Defense,
}

impl ThreatKind {
    pub fn base_score(self) -> f64 {
        match self {
            ThreatKind::Checkmate => 2000.0,
            ThreatKind::Check => 1000.0,
            ThreatKind::CheckThreat => 900.0,
            ThreatKind::Capture => 800.0,
            ThreatKind::Fork => 750.0,
            ThreatKind::DiscoveredAttack => 700.0,
            ThreatKind::Skewer => 680.0,
            ThreatKind::Pin => 650.0,
            ThreatKind::NewAttack => 600.0,
            ThreatKind::Attack => 500.0,
            ThreatKind::Defense => 300.0,
        }
    }

    fn kind_bonus(self) -> f64 {
        match self {
            ThreatKind::DiscoveredAttack => 30.0,
            ThreatKind::Fork => 25.0,
            ThreatKind::Pin => 20.0,
            _ => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreatKind::Capture => "capture",
            ThreatKind::Check => "check",
            ThreatKind::CheckThreat => "check_threat",
            ThreatKind::DiscoveredAttack => "discovered_attack",
            ThreatKind::NewAttack => "new_attack",
            ThreatKind::Attack => "attack",
            ThreatKind::Fork => "fork",
            ThreatKind::Pin => "pin",
            ThreatKind::Skewer => "skewer",
            ThreatKind::Checkmate => "checkmate",
            ThreatKind::Defense => "defense",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreatRecord {
    pub from: Square,
    pub to: Square,
    pub target: Square,
    pub kind: ThreatKind,
    pub value: f64,
    pub strength: f64,
}

impl ThreatRecord {
    fn new(from: Square, to: Square, target: Square, kind: ThreatKind, value: f64) -> Self {
        Self {
            from,
            to,
            target,
            kind,
            value,
            strength: 0.0,
        }
    }
}

/// Strength before the random tie-break
pub fn base_strength(kind: ThreatKind, value: f64) -> f64 {
    let value_bonus = if value >= 9.0 {
        50.0
    } else if value >= 5.0 {
        25.0
    } else if value >= 3.0 {
        10.0
    } else {
        0.0
    };
    kind.base_score() + value * 10.0 + value_bonus + kind.kind_bonus()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatSettings {
    pub min_value: f64,
    pub max_player: usize,
    pub max_opponent: usize,
}

impl Default for ThreatSettings {
    fn default() -> Self {
        Self {
            min_value: 1.0,
            max_player: 5,
            max_opponent: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThreatReport {
    pub player: Vec<ThreatRecord>,
    pub opponent: Vec<ThreatRecord>,
}

pub fn detect_threats<R: Rng + ?Sized>(
    position: &GamePosition,
    settings: &ThreatSettings,
    rng: &mut R,
) -> ThreatReport {
    let player = player_threats(position, settings.min_value);
    let opponent = opponent_threats(position, settings.min_value);
    ThreatReport {
        player: prioritize(player, settings.max_player, rng),
        opponent: prioritize(opponent, settings.max_opponent, rng),
    }
}

fn player_threats(position: &GamePosition, min_value: f64) -> Vec<ThreatRecord> {
    let us = position.turn();
    let board = position.chess().board();
    let mut threats = Vec::new();

    for mv in position.legal_moves() {
        let Some((from, to)) = display_squares(&mv) else {
            continue;
        };
        let after = position.play(&mv);
        let after_board = after.chess().board();

        if let Some(captured) = board.piece_at(to).filter(|p| p.color != us) {
            let value = threat_value(captured.role);
            if value >= min_value {
                threats.push(ThreatRecord::new(from, to, to, ThreatKind::Capture, value));
            }
        }

        if after.is_check() {
            if let Some(king) = after.king_of(!us) {
                threats.push(ThreatRecord::new(from, to, king, ThreatKind::Check, CHECK_VALUE));
            }
        }

        // Pieces that were not moved but see new targets
        for square in after_board.by_color(us) {
            if square == to {
                continue;
            }
            let gained = after_board.attacks_from(square) & !board.attacks_from(square);
            for target in gained & after_board.by_color(!us) {
                let Some(piece) = after_board.piece_at(target) else {
                    continue;
                };
                let value = threat_value(piece.role);
                if value >= min_value {
                    threats.push(ThreatRecord::new(
                        from,
                        to,
                        target,
                        ThreatKind::DiscoveredAttack,
                        value,
                    ));
                }
            }
        }

        for target in after_board.attacks_from(to) & after_board.by_color(!us) {
            let Some(piece) = after_board.piece_at(target) else {
                continue;
            };
            let value = threat_value(piece.role);
            if value >= min_value {
                let kind = if piece.role == Role::King {
                    ThreatKind::Check
                } else {
                    ThreatKind::NewAttack
                };
                threats.push(ThreatRecord::new(from, to, target, kind, value));
            }
        }
    }

    threats
}

fn opponent_threats(position: &GamePosition, min_value: f64) -> Vec<ThreatRecord> {
    let them = !position.turn();
    let board = position.chess().board();
    let mut threats = Vec::new();

    for square in board.by_color(them) {
        for target in board.attacks_from(square) & board.by_color(!them) {
            let Some(piece) = board.piece_at(target) else {
                continue;
            };
            let value = threat_value(piece.role);
            if value < min_value {
                continue;
            }
            let kind = if piece.role == Role::King {
                ThreatKind::CheckThreat
            } else {
                ThreatKind::Attack
            };
            threats.push(ThreatRecord::new(square, target, target, kind, value));
        }
    }

    threats
}

fn prioritize<R: Rng + ?Sized>(
    threats: Vec<ThreatRecord>,
    limit: usize,
    rng: &mut R,
) -> Vec<ThreatRecord> {
    let mut unique: Vec<ThreatRecord> = Vec::with_capacity(threats.len());
    for threat in threats {
        if !unique
            .iter()
            .any(|t| t.from == threat.from && t.to == threat.to)
        {
            unique.push(threat);
        }
    }

    for threat in &mut unique {
        threat.strength = base_strength(threat.kind, threat.value) + rng.random::<f64>();
    }

    unique.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    unique.truncate(limit);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_base_strength_table() {
        assert_eq!(base_strength(ThreatKind::Attack, 9.0), 640.0);
        assert_eq!(base_strength(ThreatKind::Capture, 3.0), 840.0);
        assert_eq!(base_strength(ThreatKind::DiscoveredAttack, 5.0), 805.0);
        assert_eq!(base_strength(ThreatKind::Check, 10.0), 1150.0);
    }

    #[test]
    fn test_rook_attacking_queen_is_opponent_attack() {
        // White to move; black rook on d8 eyes the undefended white queen on d4
        let pos = GamePosition::from_fen("3r2k1/8/8/8/3Q4/8/8/6K1 w - - 0 1").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let report = detect_threats(&pos, &ThreatSettings::default(), &mut rng);

        let attack = report
            .opponent
            .iter()
            .find(|t| t.from == Square::D8 && t.target == Square::D4)
            .unwrap();
        assert_eq!(attack.kind, ThreatKind::Attack);
        assert_eq!(attack.value, 9.0);
        assert!(attack.strength >= 640.0 && attack.strength < 641.0);
    }

    #[test]
    fn test_capture_listed_for_side_to_move() {
        let pos = GamePosition::from_fen("3r2k1/8/8/8/3Q4/8/8/6K1 b - - 0 1").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let report = detect_threats(&pos, &ThreatSettings::default(), &mut rng);

        let capture = report
            .player
            .iter()
            .find(|t| t.from == Square::D8 && t.to == Square::D4)
            .unwrap();
        assert_eq!(capture.kind, ThreatKind::Capture);
        assert!(capture.strength >= 940.0);
    }

    #[test]
    fn test_limits_and_ordering() {
        let pos = GamePosition::starting();
        let settings = ThreatSettings {
            min_value: 1.0,
            max_player: 2,
            max_opponent: 1,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let report = detect_threats(&pos, &settings, &mut rng);
        assert!(report.player.len() <= 2);
        assert!(report.opponent.len() <= 1);
        assert!(report
            .player
            .windows(2)
            .all(|w| w[0].strength >= w[1].strength));
    }

    #[test]
    fn test_min_value_filters_pawns() {
        // Black pawn on e5 attacks the white knight on d4 and nothing else
        let pos = GamePosition::from_fen("6k1/8/8/4p3/3N4/8/8/6K1 w - - 0 1").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let settings = ThreatSettings {
            min_value: 5.0,
            ..ThreatSettings::default()
        };
        let report = detect_threats(&pos, &settings, &mut rng);
        assert!(report.opponent.is_empty());

        let report = detect_threats(&pos, &ThreatSettings::default(), &mut rng);
        assert_eq!(report.opponent.len(), 1);
        assert_eq!(report.opponent[0].value, 3.0);
    }
}
