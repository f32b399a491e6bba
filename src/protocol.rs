//! Line-based wire grammar for turn actions, plus the framing tokens used
//! by the peer session layer.
//!
//! One action per line, whitespace-delimited tokens:
//!
//! ```text
//! F <row> <col>
//! A <EMP|SHIELD|SONAR> [<row> <col>]
//! A MULTISHOT AUTO <n>                      n >= 1
//! A MULTISHOT <row> <col> [<row> <col> ...]
//! ```

use core::fmt;

use crate::abilities::{AbilityTarget, AbilityType};
use crate::engine::TurnAction;
use crate::grid::Coordinate;

pub const HELLO: &str = "HELLO NEORETRO 1";
pub const CONFIG: &str = "CONFIG";
pub const MODE: &str = "MODE";
pub const PLACE: &str = "PLACE";
pub const READY: &str = "READY";
pub const READY_END: &str = "READY_END";
pub const MOVE: &str = "MOVE";
pub const APPLY: &str = "APPLY";
pub const MSG: &str = "MSG";
pub const OVER: &str = "OVER";
pub const STATE_END: &str = "STATE_END";

/// Parse failures are unrecoverable protocol errors for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EmptyLine,
    UnknownActionTag(String),
    UnknownAbility(String),
    BadCoordinate(String),
    TrailingTokens(String),
    MissingTokens(String),
    NoShots(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::EmptyLine => write!(f, "empty action line"),
            ProtocolError::UnknownActionTag(t) => write!(f, "unknown action tag '{}'", t),
            ProtocolError::UnknownAbility(a) => write!(f, "unknown ability '{}'", a),
            ProtocolError::BadCoordinate(l) => write!(f, "bad coordinate in '{}'", l),
            ProtocolError::TrailingTokens(l) => write!(f, "trailing tokens in '{}'", l),
            ProtocolError::MissingTokens(l) => write!(f, "missing tokens in '{}'", l),
            ProtocolError::NoShots(l) => write!(f, "multishot without shots in '{}'", l),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Serialize an action to one wire line (no trailing newline).
pub fn encode_action(action: &TurnAction) -> String {
    match action {
        TurnAction::Fire(c) => format!("F {} {}", c.row, c.col),
        TurnAction::UseAbility { kind, target } => {
            let mut line = format!("A {}", kind.name());
            match target {
                AbilityTarget::None => {}
                AbilityTarget::Cell(c) => {
                    line.push_str(&format!(" {} {}", c.row, c.col));
                }
                AbilityTarget::Auto(n) => {
                    line.push_str(&format!(" AUTO {}", n));
                }
                AbilityTarget::Cells(cells) => {
                    for c in cells {
                        line.push_str(&format!(" {} {}", c.row, c.col));
                    }
                }
            }
            line
        }
    }
}

/// Parse one wire line back into an action. Exact inverse of
/// [`encode_action`] for every representable action.
pub fn decode_action(line: &str) -> Result<TurnAction, ProtocolError> {
    let mut tokens = line.split_whitespace();
    let tag = tokens.next().ok_or(ProtocolError::EmptyLine)?;
    match tag {
        "F" => {
            let coord = parse_coordinate(&mut tokens, line)?;
            expect_end(&mut tokens, line)?;
            Ok(TurnAction::Fire(coord))
        }
        "A" => {
            let name = tokens
                .next()
                .ok_or_else(|| ProtocolError::MissingTokens(line.to_string()))?;
            let kind = AbilityType::from_name(name)
                .ok_or_else(|| ProtocolError::UnknownAbility(name.to_string()))?;
            let rest: Vec<&str> = tokens.collect();
            let target = match kind {
                AbilityType::Multishot => decode_multishot_target(&rest, line)?,
                // Coordinates are optional for EMP/SHIELD/SONAR.
                _ => match rest.len() {
                    0 => AbilityTarget::None,
                    2 => AbilityTarget::Cell(parse_pair(rest[0], rest[1], line)?),
                    _ => return Err(ProtocolError::TrailingTokens(line.to_string())),
                },
            };
            Ok(TurnAction::UseAbility { kind, target })
        }
        other => Err(ProtocolError::UnknownActionTag(other.to_string())),
    }
}

fn decode_multishot_target(rest: &[&str], line: &str) -> Result<AbilityTarget, ProtocolError> {
    match rest.first() {
        Some(&"AUTO") => {
            if rest.len() != 2 {
                return Err(ProtocolError::MissingTokens(line.to_string()));
            }
            let n = rest[1]
                .parse::<usize>()
                .map_err(|_| ProtocolError::BadCoordinate(line.to_string()))?;
            // A zero-shot volley has no wire form: its resolved encoding
            // would be a bare `A MULTISHOT`, which does not parse back.
            if n == 0 {
                return Err(ProtocolError::NoShots(line.to_string()));
            }
            Ok(AbilityTarget::Auto(n))
        }
        Some(_) => {
            if rest.len() % 2 != 0 {
                return Err(ProtocolError::BadCoordinate(line.to_string()));
            }
            let mut cells = Vec::with_capacity(rest.len() / 2);
            for pair in rest.chunks(2) {
                cells.push(parse_pair(pair[0], pair[1], line)?);
            }
            Ok(AbilityTarget::Cells(cells))
        }
        None => Err(ProtocolError::MissingTokens(line.to_string())),
    }
}

fn parse_pair(row: &str, col: &str, line: &str) -> Result<Coordinate, ProtocolError> {
    let row = row
        .parse::<usize>()
        .map_err(|_| ProtocolError::BadCoordinate(line.to_string()))?;
    let col = col
        .parse::<usize>()
        .map_err(|_| ProtocolError::BadCoordinate(line.to_string()))?;
    Ok(Coordinate::new(row, col))
}

fn parse_coordinate<'a, I>(tokens: &mut I, line: &str) -> Result<Coordinate, ProtocolError>
where
    I: Iterator<Item = &'a str>,
{
    let row = tokens
        .next()
        .ok_or_else(|| ProtocolError::MissingTokens(line.to_string()))?;
    let col = tokens
        .next()
        .ok_or_else(|| ProtocolError::MissingTokens(line.to_string()))?;
    parse_pair(row, col, line)
}

fn expect_end<'a, I>(tokens: &mut I, line: &str) -> Result<(), ProtocolError>
where
    I: Iterator<Item = &'a str>,
{
    if tokens.next().is_some() {
        return Err(ProtocolError::TrailingTokens(line.to_string()));
    }
    Ok(())
}
