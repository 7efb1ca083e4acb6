//! Per-engine launch and UCI option configuration

use crate::error::EngineError;

/// Option names engines use for opening books; values vary between engines
const BOOK_OPTIONS: [&str; 4] = ["Book", "BookFile", "OwnBook", "UseBook"];

/// Option names engines use for endgame tablebases
const TABLEBASE_OPTIONS: [&str; 4] = ["SyzygyPath", "TablebasePath", "Tablebase", "TbPath"];

/// Option names engines use for mate search depth
const MATE_FINDER_OPTIONS: [&str; 4] = ["MateSearch", "MateFinder", "MateDepth", "SearchForMate"];

/// Settings specific to Maia-style neural engines
#[derive(Clone, Debug, PartialEq)]
pub struct MaiaOptions {
    pub weights_file: Option<String>,
    pub nodes_per_second_limit: f64,
    pub use_slowmover: bool,
}

impl Default for MaiaOptions {
    fn default() -> Self {
        Self {
            weights_file: None,
            nodes_per_second_limit: 0.001,
            use_slowmover: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Path to the engine binary
    pub path: String,

    /// `Some` for Maia engines
    pub maia: Option<MaiaOptions>,

    /// Opening book file, if one exists on disk
    pub book_file: Option<String>,

    /// Endgame tablebase directory, if one exists on disk
    pub tablebase_path: Option<String>,

    /// Search threads for standard engines
    pub threads: u32,

    /// Hash table size in MB for standard engines
    pub hash_mb: u32,

    /// MultiPV to request at startup (set when intelligence is on)
    pub multipv: Option<u32>,

    /// Mate search depth; 0 disables the mate-finder options
    pub mate_finder_value: u32,
}

impl EngineConfig {
    pub fn standard(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            maia: None,
            book_file: None,
            tablebase_path: None,
            threads: 1,
            hash_mb: 1024,
            multipv: None,
            mate_finder_value: 5,
        }
    }

    pub fn maia(path: impl Into<String>, options: MaiaOptions) -> Self {
        Self {
            maia: Some(options),
            ..Self::standard(path)
        }
    }

    pub fn is_maia(&self) -> bool {
        self.maia.is_some()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.path.trim().is_empty() {
            return Err(EngineError::Config("engine path is empty"));
        }
        if self.threads == 0 {
            return Err(EngineError::Config("engine threads must be at least 1"));
        }
        Ok(())
    }

    /// Startup handshake commands, in send order. Ends with `isready`.
    pub fn init_commands(&self) -> Vec<String> {
        let mut cmds = vec!["uci".to_string()];

        match &self.maia {
            Some(maia) => {
                if let Some(weights) = &maia.weights_file {
                    cmds.push(set_option("WeightsFile", weights));
                }
                cmds.push(set_option("Threads", 1));
                cmds.push(set_option("MinibatchSize", 1));
                cmds.push(set_option("MaxPrefetch", 0));
                cmds.push(set_option("NodesPerSecondLimit", maia.nodes_per_second_limit));
                if maia.use_slowmover {
                    cmds.push(set_option("SlowMover", 0));
                }
            }
            None => {
                cmds.push(set_option("Threads", self.threads));
                cmds.push(set_option("Hash", self.hash_mb));
                if let Some(multipv) = self.multipv {
                    cmds.push(set_option("MultiPV", multipv));
                }
            }
        }

        if let Some(book) = &self.book_file {
            for name in BOOK_OPTIONS {
                cmds.push(set_option(name, "true"));
            }
            cmds.push(set_option("BookFile", book));
        }

        if let Some(tb) = &self.tablebase_path {
            for name in TABLEBASE_OPTIONS {
                cmds.push(set_option(name, tb));
            }
        }

        if self.mate_finder_value > 0 {
            for name in MATE_FINDER_OPTIONS {
                cmds.push(set_option(name, self.mate_finder_value));
            }
        }

        cmds.push("isready".to_string());
        cmds
    }
}

pub fn set_option(name: &str, value: impl std::fmt::Display) -> String {
    format!("setoption name {name} value {value}")
}
