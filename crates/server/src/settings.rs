//! Runtime settings snapshot
//!
//! Client-facing keys are kebab-case; intelligence keys keep their
//! snake_case names and sit flattened at the same level. A snapshot is
//! immutable once published; updates build a merged copy and swap it in.

use analysis_engine::intelligence::{IntelligenceConfig, SelectionPolicy};
use analysis_engine::ThreatSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub depth: u32,
    pub multipv: u32,
    pub num_cores: u32,
    pub hashtable_ram: u32,
    pub mate_finder_value: u32,

    pub legit_auto_move: bool,
    pub auto_move_time: u64,
    pub auto_move_time_random: u64,
    pub auto_move_time_random_div: u64,
    pub auto_move_time_random_multi: u64,

    pub premove_enabled: bool,
    pub max_premoves: u32,
    pub premove_time: u64,
    pub premove_time_random: u64,
    pub premove_time_random_div: u64,
    pub premove_time_random_multi: u64,

    /// Percent chance of playing the top-ranked move once intelligence is used
    pub best_move_chance: f64,
    /// Stored and reported for clients; selection follows `best_move_chance` alone
    pub random_best_move: bool,

    pub show_hints: bool,
    pub move_analysis: bool,
    pub depth_bar: bool,
    pub evaluation_bar: bool,
    pub show_threat_arrows: bool,
    pub max_player_threats: usize,
    pub max_opponent_threats: usize,

    #[serde(flatten)]
    pub intelligence: IntelligenceConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            depth: 15,
            multipv: 3,
            num_cores: 1,
            hashtable_ram: 1024,
            mate_finder_value: 5,
            legit_auto_move: false,
            auto_move_time: 5000,
            auto_move_time_random: 2000,
            auto_move_time_random_div: 10,
            auto_move_time_random_multi: 1000,
            premove_enabled: false,
            max_premoves: 3,
            premove_time: 1000,
            premove_time_random: 500,
            premove_time_random_div: 100,
            premove_time_random_multi: 1,
            best_move_chance: 30.0,
            random_best_move: false,
            show_hints: true,
            move_analysis: true,
            depth_bar: true,
            evaluation_bar: true,
            show_threat_arrows: false,
            max_player_threats: 5,
            max_opponent_threats: 3,
            intelligence: IntelligenceConfig::default(),
        }
    }
}

impl Settings {
    /// Build a new snapshot with the keys in `patch` applied over this one.
    ///
    /// Unknown keys are ignored; a key with the wrong type rejects the whole patch.
    pub fn merge(&self, patch: &Value) -> Result<Settings, serde_json::Error> {
        let Value::Object(changes) = patch else {
            return Err(serde::de::Error::custom("settings must be a JSON object"));
        };
        let mut merged = serde_json::to_value(self)?;
        if let Value::Object(current) = &mut merged {
            for (key, value) in changes {
                current.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged)
    }

    pub fn threat_settings(&self) -> ThreatSettings {
        ThreatSettings {
            max_player: self.max_player_threats,
            max_opponent: self.max_opponent_threats,
            ..ThreatSettings::default()
        }
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            best_move_chance: self.best_move_chance,
        }
    }

    /// Hint arrows shown per cycle
    pub fn hint_limit(&self) -> usize {
        (self.multipv as usize).min(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_serialize_with_client_keys() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["depth"], 15);
        assert_eq!(value["legit-auto-move"], false);
        assert_eq!(value["auto-move-time-random-div"], 10);
        assert_eq!(value["show-threat-arrows"], false);
        assert_eq!(value["low_intelligence_threshold"], -1.5);
        assert_eq!(value["intelligence_enabled"], false);
    }

    #[test]
    fn test_merge_applies_partial_patch() {
        let base = Settings::default();
        let merged = base
            .merge(&json!({
                "depth": 20,
                "show-hints": false,
                "intelligence_enabled": true,
                "knight_preference": 1.3,
                "not-a-setting": 1
            }))
            .unwrap();
        assert_eq!(merged.depth, 20);
        assert!(!merged.show_hints);
        assert!(merged.intelligence.intelligence_enabled);
        assert_eq!(merged.intelligence.knight_preference, 1.3);
        assert_eq!(merged.multipv, base.multipv);
        // Source snapshot is untouched
        assert_eq!(base.depth, 15);
    }

    #[test]
    fn test_merge_rejects_wrong_types() {
        let base = Settings::default();
        assert!(base.merge(&json!({"depth": "deep"})).is_err());
        assert!(base.merge(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_hint_limit_caps_at_five() {
        let mut settings = Settings::default();
        assert_eq!(settings.hint_limit(), 3);
        settings.multipv = 8;
        assert_eq!(settings.hint_limit(), 5);
    }

    #[test]
    fn test_selection_policy_ignores_random_flag() {
        let mut settings = Settings::default();
        assert_eq!(settings.selection_policy().best_move_chance, 30.0);
        settings.random_best_move = true;
        settings.best_move_chance = 100.0;
        assert_eq!(settings.selection_policy(), SelectionPolicy::always_best());
        settings.random_best_move = false;
        assert_eq!(settings.selection_policy(), SelectionPolicy::always_best());
    }
}
