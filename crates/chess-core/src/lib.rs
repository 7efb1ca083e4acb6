pub use shakmaty;

pub mod rules;
pub mod values;

pub use rules::{
    castle_side, display_squares, is_uci_syntax, uci_string, GamePosition, RulesError,
    STARTING_FEN,
};
pub use values::{material_value, threat_value};
