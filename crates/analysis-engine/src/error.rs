//! Engine-side error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Failed to spawn engine '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine crashed: {0}")]
    Crashed(String),
}
