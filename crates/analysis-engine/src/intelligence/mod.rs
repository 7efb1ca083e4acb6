//! Post-processing of engine candidates: re-scoring, special behaviors and
//! the final move decision.

pub mod config;
pub mod decision;
pub mod features;
pub mod multiplier;
pub mod scoring;
pub mod special;

pub use config::{CastleSide, IntelligenceConfig};
pub use decision::{
    decide, select_index, selection_weights, Decision, DecisionKind, DecisionLog,
    DecisionOutcome, DecisionStats, SelectionPolicy,
};
pub use features::extract_features;
pub use multiplier::apply_multiplier;
pub use scoring::{is_critical_position, IntelligenceEngine, PositionContext};
