use std::env;
use std::path::Path;
use std::time::Duration;

use analysis_engine::{EngineConfig, MaiaOptions};

use crate::settings::Settings;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub engine_paths: Vec<String>,
    pub maia_engine_path: Option<String>,
    pub maia_weights_file: Option<String>,
    pub maia_nodes_per_second_limit: f64,
    pub maia_slowmover: bool,
    pub book_file: Option<String>,
    pub tablebase_path: Option<String>,
    pub analysis_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            engine_paths: Vec::new(),
            maia_engine_path: None,
            maia_weights_file: None,
            maia_nodes_per_second_limit: 0.001,
            maia_slowmover: false,
            book_file: None,
            tablebase_path: None,
            analysis_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Paths that do not exist on disk are dropped rather than handed to the engine
fn existing_path(key: &str) -> Option<String> {
    non_empty(key).filter(|p| Path::new(p).exists())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            engine_paths: env::var("ENGINE_PATHS")
                .map(|v| parse_engine_paths(&v))
                .unwrap_or_default(),
            maia_engine_path: non_empty("MAIA_ENGINE_PATH"),
            maia_weights_file: existing_path("MAIA_WEIGHTS_FILE"),
            maia_nodes_per_second_limit: env::var("MAIA_NODES_PER_SECOND_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.maia_nodes_per_second_limit),
            maia_slowmover: env::var("MAIA_SLOWMOVER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.maia_slowmover),
            book_file: existing_path("BOOK_FILE"),
            tablebase_path: existing_path("TABLEBASE_PATH"),
            analysis_timeout: env::var("ANALYSIS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis_timeout),
            poll_interval: env::var("ENGINE_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
        }
    }

    /// One engine configuration per configured binary, Maia first when present
    pub fn engine_configs(&self, settings: &Settings) -> Vec<EngineConfig> {
        let threads = settings.num_cores.clamp(1, num_cpus::get().max(1) as u32);
        let multipv = settings
            .intelligence
            .intelligence_enabled
            .then_some(settings.multipv);

        let mut configs = Vec::new();
        if let Some(path) = &self.maia_engine_path {
            configs.push(EngineConfig::maia(
                path.clone(),
                MaiaOptions {
                    weights_file: self.maia_weights_file.clone(),
                    nodes_per_second_limit: self.maia_nodes_per_second_limit,
                    use_slowmover: self.maia_slowmover,
                },
            ));
        }
        configs.extend(self.engine_paths.iter().map(EngineConfig::standard));

        for config in &mut configs {
            config.threads = threads;
            config.hash_mb = settings.hashtable_ram;
            config.mate_finder_value = settings.mate_finder_value;
            if !config.is_maia() {
                config.multipv = multipv;
                config.book_file = self.book_file.clone();
                config.tablebase_path = self.tablebase_path.clone();
            }
        }
        configs
    }
}

pub fn parse_engine_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_paths_skip_blanks() {
        assert_eq!(
            parse_engine_paths(" /usr/bin/stockfish, ,./engines/sf2 ,"),
            vec!["/usr/bin/stockfish", "./engines/sf2"]
        );
    }

    #[test]
    fn test_engine_configs_follow_settings() {
        let config = Config {
            engine_paths: vec!["stockfish".into()],
            maia_engine_path: Some("lc0".into()),
            ..Config::default()
        };
        let mut settings = Settings::default();
        settings.hashtable_ram = 256;
        settings.intelligence.intelligence_enabled = true;

        let engines = config.engine_configs(&settings);
        assert_eq!(engines.len(), 2);
        assert!(engines[0].is_maia());
        assert_eq!(engines[0].multipv, None);
        assert_eq!(engines[1].path, "stockfish");
        assert_eq!(engines[1].hash_mb, 256);
        assert_eq!(engines[1].multipv, Some(3));
        assert_eq!(engines[1].threads, 1);
    }
}
