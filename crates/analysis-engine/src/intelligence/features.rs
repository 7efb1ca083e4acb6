use chess_core::shakmaty::Move;
use chess_core::{castle_side, display_squares, material_value, GamePosition};

use crate::candidate::MoveFeatures;

/// Classify `mv` in `position`. `mv` must be legal there.
pub fn extract_features(position: &GamePosition, mv: &Move) -> MoveFeatures {
    let after = position.play(mv);
    let destination = display_squares(mv).map(|(_, to)| to).unwrap_or_else(|| mv.to());

    let mover_value = material_value(mv.role());
    let captured_value = mv.capture().map(material_value).unwrap_or(0);
    let can_recapture = after.has_recapture_on(destination);

    let mut aggressiveness = captured_value;
    if can_recapture {
        aggressiveness += mover_value;
    }

    let is_trade = mv.is_capture() && can_recapture;
    let trade_value = if is_trade {
        captured_value - mover_value
    } else {
        0
    };

    let opponent = !position.turn();
    let newly_pinned = after.pinned_to_king(opponent) & !position.pinned_to_king(opponent);

    MoveFeatures {
        role: Some(mv.role()),
        is_capture: mv.is_capture(),
        is_check: after.is_check(),
        is_castle: mv.is_castle(),
        castle_side: castle_side(mv),
        is_en_passant: mv.is_en_passant(),
        is_promotion: mv.is_promotion(),
        creates_pin: !newly_pinned.is_empty(),
        aggressiveness,
        is_trade,
        trade_value,
    }
}
