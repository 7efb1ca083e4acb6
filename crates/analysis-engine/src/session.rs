//! Incremental parsing of UCI search output into one analysis session

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chess_core::{display_squares, is_uci_syntax, GamePosition};
use tracing::{debug, warn};

use crate::candidate::{MoveCandidate, Score, MAX_PV_LEN};

/// Fields of interest from an `info` line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineLine {
    Info(InfoLine),
    /// `None` for `bestmove (none)` / `bestmove 0000`
    BestMove(Option<String>),
    Other,
}

fn next_parsed<'a, T: std::str::FromStr>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<T> {
    tokens.next().and_then(|t| t.parse().ok())
}

/// Classify one line of engine output
pub fn parse_line(line: &str) -> EngineLine {
    let line = line.trim();
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("info") => EngineLine::Info(parse_info(tokens)),
        Some("bestmove") => match tokens.next() {
            Some("(none)") | Some("0000") | None => EngineLine::BestMove(None),
            Some(mv) => EngineLine::BestMove(Some(mv.to_string())),
        },
        _ => EngineLine::Other,
    }
}

fn parse_info<'a>(mut tokens: impl Iterator<Item = &'a str>) -> InfoLine {
    let mut info = InfoLine::default();
    while let Some(token) = tokens.next() {
        match token {
            "depth" => info.depth = next_parsed(&mut tokens),
            "nodes" => info.nodes = next_parsed(&mut tokens),
            "time" => info.time_ms = next_parsed(&mut tokens),
            "multipv" => info.multipv = next_parsed(&mut tokens),
            "score" => {
                info.score = match tokens.next() {
                    Some("cp") => next_parsed(&mut tokens).map(Score::Cp),
                    Some("mate") => next_parsed(&mut tokens).map(Score::Mate),
                    _ => None,
                };
            }
            "pv" => {
                // PV runs to the end of the line unless another section follows
                for mv in tokens.by_ref() {
                    if mv.starts_with("bmc") || mv == "string" {
                        break;
                    }
                    info.pv.push(mv.to_string());
                }
            }
            _ => {}
        }
    }
    info
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct FinishedAnalysis {
    pub session_id: u64,
    pub best_move: Option<String>,
    /// Best first, ties in encounter order
    pub candidates: Vec<MoveCandidate>,
    pub depth: u32,
    pub evaluation: Option<f64>,
    pub mate_score: Option<i32>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Ignored,
    /// Search statistics moved forward
    Progress,
    /// A candidate was inserted or replaced
    Candidate,
    /// A line referenced a move that is malformed or illegal here
    Rejected(String),
    Finished(FinishedAnalysis),
}

pub struct AnalysisSession {
    pub id: u64,
    pub target_depth: u32,
    pub depth: u32,
    pub nodes: u64,
    pub time_ms: u64,
    started: Instant,
    candidates: BTreeMap<u32, MoveCandidate>,
    next_seq: u64,
    pub best_move: Option<String>,
    pub complete: bool,
    pub mate_found: bool,
    /// Top-line evaluation in pawns
    pub evaluation: Option<f64>,
    pub mate_score: Option<i32>,
}

impl AnalysisSession {
    pub fn new(id: u64, target_depth: u32) -> Self {
        Self {
            id,
            target_depth,
            depth: 0,
            nodes: 0,
            time_ms: 0,
            started: Instant::now(),
            candidates: BTreeMap::new(),
            next_seq: 0,
            best_move: None,
            complete: false,
            mate_found: false,
            evaluation: None,
            mate_score: None,
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidate_at(&self, pv_index: u32) -> Option<&MoveCandidate> {
        self.candidates.get(&pv_index)
    }

    /// Snapshot sorted by score descending, ties by encounter order
    pub fn sorted_candidates(&self) -> Vec<MoveCandidate> {
        let mut list: Vec<MoveCandidate> = self.candidates.values().cloned().collect();
        list.sort_by(|a, b| {
            b.score_pawns
                .total_cmp(&a.score_pawns)
                .then(a.seq.cmp(&b.seq))
        });
        list
    }

    pub fn progress_percent(&self) -> f64 {
        if self.complete {
            return 100.0;
        }
        if self.target_depth == 0 {
            return 0.0;
        }
        (f64::from(self.depth) / f64::from(self.target_depth) * 100.0).min(100.0)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_timed_out(&self, ceiling: Duration) -> bool {
        !self.complete && self.started.elapsed() >= ceiling
    }

    /// Feed one engine line evaluated against `position`
    pub fn process_line(&mut self, line: &str, position: &GamePosition) -> SessionEvent {
        if self.complete {
            return SessionEvent::Ignored;
        }
        match parse_line(line) {
            EngineLine::Info(info) => self.apply_info(info, position),
            EngineLine::BestMove(mv) => self.apply_bestmove(mv, position),
            EngineLine::Other => SessionEvent::Ignored,
        }
    }

    fn apply_info(&mut self, info: InfoLine, position: &GamePosition) -> SessionEvent {
        let mut progressed = false;
        if let Some(depth) = info.depth {
            self.depth = depth;
            progressed = true;
        }
        if let Some(nodes) = info.nodes {
            self.nodes = nodes;
            progressed = true;
        }
        if let Some(time) = info.time_ms {
            self.time_ms = time;
        }

        let (Some(score), Some(head)) = (info.score, info.pv.first()) else {
            return if progressed {
                SessionEvent::Progress
            } else {
                SessionEvent::Ignored
            };
        };

        let Some(mut candidate) = build_candidate(head, position) else {
            warn!(session = self.id, mv = %head, "Discarding PV with illegal head move");
            return SessionEvent::Rejected(head.clone());
        };

        let pv_index = info.multipv.unwrap_or(1);
        candidate.apply_score(score);
        candidate.depth = info.depth.unwrap_or(self.depth);
        candidate.nodes = info.nodes.unwrap_or(self.nodes);
        candidate.pv = info.pv.iter().take(MAX_PV_LEN).cloned().collect();
        candidate.pv_index = pv_index;

        if pv_index == 1 {
            self.evaluation = Some(score.pawns());
            self.mate_score = score.mate_in();
        }
        if score.mate_in().is_some() {
            self.mate_found = true;
        }

        if self.upsert(pv_index, candidate) {
            SessionEvent::Candidate
        } else {
            SessionEvent::Progress
        }
    }

    /// Insert keeping one entry per move; shallower updates never replace deeper ones
    fn upsert(&mut self, pv_index: u32, mut candidate: MoveCandidate) -> bool {
        if let Some(slot) = self.candidates.get(&pv_index) {
            if slot.uci != candidate.uci && slot.depth > candidate.depth {
                return false;
            }
        }

        let existing = self
            .candidates
            .iter()
            .find(|(_, c)| c.uci == candidate.uci)
            .map(|(idx, c)| (*idx, c.depth, c.seq));

        match existing {
            Some((_, depth, _)) if depth > candidate.depth => return false,
            Some((idx, _, seq)) => {
                self.candidates.remove(&idx);
                candidate.seq = seq;
            }
            None => {
                candidate.seq = self.next_seq;
                self.next_seq += 1;
            }
        }

        self.candidates.insert(pv_index, candidate);
        true
    }

    fn apply_bestmove(&mut self, best: Option<String>, position: &GamePosition) -> SessionEvent {
        if let Some(mv) = &best {
            if build_candidate(mv, position).is_none() {
                warn!(session = self.id, mv = %mv, "Engine reported an illegal best move");
                return SessionEvent::Rejected(mv.clone());
            }
            if self.candidates.is_empty() {
                if let Some(mut synthetic) = build_candidate(mv, position) {
                    synthetic.apply_score(Score::Cp(0));
                    synthetic.depth = self.depth;
                    synthetic.pv = vec![mv.clone()];
                    self.upsert(1, synthetic);
                }
            }
        }

        self.best_move = best.clone();
        self.complete = true;
        debug!(
            session = self.id,
            best = ?best,
            candidates = self.candidates.len(),
            depth = self.depth,
            "Analysis finished"
        );

        SessionEvent::Finished(FinishedAnalysis {
            session_id: self.id,
            best_move: best,
            candidates: self.sorted_candidates(),
            depth: self.depth,
            evaluation: self.evaluation,
            mate_score: self.mate_score,
        })
    }
}

fn build_candidate(uci: &str, position: &GamePosition) -> Option<MoveCandidate> {
    if !is_uci_syntax(uci) {
        return None;
    }
    let mv = position.parse_move(uci)?;
    let (from, to) = display_squares(&mv)?;
    Some(MoveCandidate::new(mv, uci.to_string(), from, to))
}
