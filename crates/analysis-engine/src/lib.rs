pub use chess_core;

pub mod candidate;
pub mod config;
pub mod error;
pub mod intelligence;
pub mod process;
pub mod session;
pub mod threats;

pub use candidate::{CandidateStatus, MoveCandidate, MoveFeatures, Score};
pub use config::{EngineConfig, MaiaOptions};
pub use error::EngineError;
pub use process::EngineProcess;
pub use session::{AnalysisSession, FinishedAnalysis, SessionEvent};
pub use threats::{detect_threats, ThreatKind, ThreatRecord, ThreatReport, ThreatSettings};
