//! Client wire commands and their validation
//!
//! Every outbound line is one of four commands. Rendering validates first;
//! an invalid command is never written to a client.

use std::sync::LazyLock;

use chess_core::is_uci_syntax;
use regex::Regex;
use serde::Serialize;

pub const MAX_DELAY_MS: u64 = 300_000;
pub const MAX_ARROWS: usize = 10;
pub const MAX_HIGHLIGHTS: usize = 8;
pub const MAX_EFFECTS: usize = 5;
pub const MAX_MATE: i32 = 100;
pub const MAX_PAWNS: f64 = 50.0;

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));
static SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h][1-8]$").expect("valid square regex"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid move {0:?}")]
    Move(String),
    #[error("delay {0} ms outside 0..={MAX_DELAY_MS}")]
    Delay(u64),
    #[error("too many {what}: {count} > {max}")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },
    #[error("invalid color {0:?}")]
    Color(String),
    #[error("invalid square {0:?}")]
    Square(String),
    #[error("opacity {0} outside [0, 1]")]
    Opacity(f64),
    #[error("evaluation {0} out of range")]
    Evaluation(String),
    #[error("depth progress {0} outside [0, 100]")]
    Depth(f64),
    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

/// Effect badges a client knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectKind {
    BestMove,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
    Brilliant,
    GreatFind,
    WinnerWhite,
    WinnerBlack,
    ResignWhite,
    MissedWin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrow {
    pub from: String,
    pub to: String,
    pub color: String,
    pub opacity: f64,
}

impl Arrow {
    pub fn new(from: impl Into<String>, to: impl Into<String>, color: &str, opacity: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            color: color.to_string(),
            opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub square: String,
    pub color: String,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub square: String,
    #[serde(rename = "type")]
    pub kind: EffectKind,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualUpdate {
    pub arrows: Vec<Arrow>,
    pub highlights: Vec<Highlight>,
    pub effects: Vec<Effect>,
}

impl VisualUpdate {
    pub fn is_empty(&self) -> bool {
        self.arrows.is_empty() && self.highlights.is_empty() && self.effects.is_empty()
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        check_count("arrows", self.arrows.len(), MAX_ARROWS)?;
        check_count("highlights", self.highlights.len(), MAX_HIGHLIGHTS)?;
        check_count("effects", self.effects.len(), MAX_EFFECTS)?;

        for arrow in &self.arrows {
            check_square(&arrow.from)?;
            check_square(&arrow.to)?;
            check_color(&arrow.color)?;
            check_opacity(arrow.opacity)?;
        }
        for highlight in &self.highlights {
            check_square(&highlight.square)?;
            check_color(&highlight.color)?;
            check_opacity(highlight.opacity)?;
        }
        for effect in &self.effects {
            check_square(&effect.square)?;
            check_color(&effect.color)?;
        }
        Ok(())
    }
}

fn check_count(what: &'static str, count: usize, max: usize) -> Result<(), ProtocolError> {
    if count > max {
        return Err(ProtocolError::TooMany { what, count, max });
    }
    Ok(())
}

fn check_square(square: &str) -> Result<(), ProtocolError> {
    if !SQUARE_RE.is_match(square) {
        return Err(ProtocolError::Square(square.to_string()));
    }
    Ok(())
}

fn check_color(color: &str) -> Result<(), ProtocolError> {
    if !COLOR_RE.is_match(color) {
        return Err(ProtocolError::Color(color.to_string()));
    }
    Ok(())
}

fn check_opacity(opacity: f64) -> Result<(), ProtocolError> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(ProtocolError::Opacity(opacity));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalValue {
    Mate(i32),
    Pawns(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WireCommand {
    Move { uci: String, delay_ms: Option<u64> },
    Visual(VisualUpdate),
    Evaluation(EvalValue),
    Depth(f64),
}

impl WireCommand {
    pub fn name(&self) -> &'static str {
        match self {
            WireCommand::Move { .. } => "move_command",
            WireCommand::Visual(_) => "visual_update",
            WireCommand::Evaluation(_) => "evaluation_update",
            WireCommand::Depth(_) => "depth_update",
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            WireCommand::Move { uci, delay_ms } => {
                if !is_uci_syntax(uci) {
                    return Err(ProtocolError::Move(uci.clone()));
                }
                match delay_ms {
                    Some(d) if *d > MAX_DELAY_MS => Err(ProtocolError::Delay(*d)),
                    _ => Ok(()),
                }
            }
            WireCommand::Visual(update) => update.validate(),
            WireCommand::Evaluation(EvalValue::Mate(n)) => {
                if n.abs() > MAX_MATE {
                    return Err(ProtocolError::Evaluation(n.to_string()));
                }
                Ok(())
            }
            WireCommand::Evaluation(EvalValue::Pawns(p)) => {
                if !(-MAX_PAWNS..=MAX_PAWNS).contains(p) {
                    return Err(ProtocolError::Evaluation(p.to_string()));
                }
                Ok(())
            }
            WireCommand::Depth(progress) => {
                if !(0.0..=100.0).contains(progress) {
                    return Err(ProtocolError::Depth(*progress));
                }
                Ok(())
            }
        }
    }

    /// Validate and produce the line sent to clients
    pub fn render(&self) -> Result<String, ProtocolError> {
        self.validate()?;
        let line = match self {
            WireCommand::Move {
                uci,
                delay_ms: Some(delay),
            } if *delay > 0 => format!("move_command {uci} delay_ms {delay}"),
            WireCommand::Move { uci, .. } => format!("move_command {uci}"),
            WireCommand::Visual(update) => {
                let json = serde_json::to_string(update)
                    .map_err(|e| ProtocolError::Serialize(e.to_string()))?;
                format!("visual_update {json}")
            }
            WireCommand::Evaluation(EvalValue::Mate(n)) => format!("evaluation_update {n} true"),
            WireCommand::Evaluation(EvalValue::Pawns(p)) => {
                format!("evaluation_update {p:.2} false")
            }
            WireCommand::Depth(progress) => format!("depth_update {progress:.1}"),
        };
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_rendering() {
        let plain = WireCommand::Move {
            uci: "e2e4".into(),
            delay_ms: None,
        };
        assert_eq!(plain.render().unwrap(), "move_command e2e4");

        let zero = WireCommand::Move {
            uci: "e7e8q".into(),
            delay_ms: Some(0),
        };
        assert_eq!(zero.render().unwrap(), "move_command e7e8q");

        let delayed = WireCommand::Move {
            uci: "g1f3".into(),
            delay_ms: Some(1200),
        };
        assert_eq!(delayed.render().unwrap(), "move_command g1f3 delay_ms 1200");
    }

    #[test]
    fn test_move_validation() {
        let bad = WireCommand::Move {
            uci: "e2e9".into(),
            delay_ms: None,
        };
        assert!(matches!(bad.render(), Err(ProtocolError::Move(_))));

        let slow = WireCommand::Move {
            uci: "e2e4".into(),
            delay_ms: Some(300_001),
        };
        assert_eq!(slow.validate(), Err(ProtocolError::Delay(300_001)));
    }

    #[test]
    fn test_evaluation_rendering_and_ranges() {
        assert_eq!(
            WireCommand::Evaluation(EvalValue::Pawns(0.456)).render().unwrap(),
            "evaluation_update 0.46 false"
        );
        assert_eq!(
            WireCommand::Evaluation(EvalValue::Mate(-3)).render().unwrap(),
            "evaluation_update -3 true"
        );
        assert!(WireCommand::Evaluation(EvalValue::Pawns(50.5)).validate().is_err());
        assert!(WireCommand::Evaluation(EvalValue::Mate(101)).validate().is_err());
        assert!(WireCommand::Evaluation(EvalValue::Mate(100)).validate().is_ok());
    }

    #[test]
    fn test_depth_rendering() {
        assert_eq!(WireCommand::Depth(46.666).render().unwrap(), "depth_update 46.7");
        assert_eq!(WireCommand::Depth(100.0).render().unwrap(), "depth_update 100.0");
        assert!(WireCommand::Depth(100.5).validate().is_err());
    }

    #[test]
    fn test_visual_payload_is_compact() {
        let update = VisualUpdate {
            arrows: vec![Arrow::new("e2", "e4", "#0080ff", 0.8)],
            highlights: Vec::new(),
            effects: vec![Effect {
                square: "e4".into(),
                kind: EffectKind::BestMove,
                color: "#0080ff".into(),
            }],
        };
        assert_eq!(
            WireCommand::Visual(update).render().unwrap(),
            r##"visual_update {"arrows":[{"from":"e2","to":"e4","color":"#0080ff","opacity":0.8}],"highlights":[],"effects":[{"square":"e4","type":"BestMove","color":"#0080ff"}]}"##
        );
    }

    #[test]
    fn test_visual_validation() {
        let mut update = VisualUpdate::default();
        update.arrows = (0..11).map(|_| Arrow::new("a1", "a2", "#ffffff", 0.5)).collect();
        assert!(matches!(
            update.validate(),
            Err(ProtocolError::TooMany { what: "arrows", .. })
        ));

        let bad_color = VisualUpdate {
            arrows: vec![Arrow::new("a1", "a2", "red", 0.5)],
            ..VisualUpdate::default()
        };
        assert!(matches!(bad_color.validate(), Err(ProtocolError::Color(_))));

        let bad_square = VisualUpdate {
            arrows: vec![Arrow::new("i1", "a2", "#ABCDEF", 0.5)],
            ..VisualUpdate::default()
        };
        assert!(matches!(bad_square.validate(), Err(ProtocolError::Square(_))));

        let bad_opacity = VisualUpdate {
            highlights: vec![Highlight {
                square: "d4".into(),
                color: "#ABCDEF".into(),
                opacity: 1.2,
            }],
            ..VisualUpdate::default()
        };
        assert!(matches!(bad_opacity.validate(), Err(ProtocolError::Opacity(_))));
    }
}
