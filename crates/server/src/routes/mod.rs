pub mod game_state;
pub mod health;
pub mod settings;
pub mod stats;
pub mod ws;
