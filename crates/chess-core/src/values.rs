//! Piece values used by the scoring and threat layers

use shakmaty::Role;

pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;

/// Threat weight of a king; dominates every other target
pub const KING_THREAT_VALUE: f64 = 100.0;

/// Material value (king counts as 0)
pub fn material_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => 0,
    }
}

/// Value of a threatened piece, king included
pub fn threat_value(role: Role) -> f64 {
    match role {
        Role::King => KING_THREAT_VALUE,
        other => f64::from(material_value(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_king_has_no_material_value() {
        assert_eq!(material_value(Role::King), 0);
        assert_eq!(threat_value(Role::King), 100.0);
    }

    #[test]
    fn test_threat_value_matches_material() {
        assert_eq!(threat_value(Role::Queen), 9.0);
        assert_eq!(threat_value(Role::Knight), 3.0);
    }
}
