//! Classification of individual benchmark log lines.

use std::fmt;

/// Marker substring of a line announcing a new problem size.
pub const GROUP_START_MARKER: &str = "Expanded genome";

/// Marker substring of a line reporting a single speedup measurement.
pub const MEASUREMENT_MARKER: &str = "GPU speed up";

/// The role a single line of a benchmark log plays.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LogLine {
    /// The benchmark built a new set of networks of the given size, e.g.
    /// `/* Expanded genome set built (size: 1024) */`.
    GroupStart(u64),
    /// The benchmark measured a speedup, e.g. `~*~*~*~* GPU speed up: 3.57 *~*~*~*~`.
    Measurement(f64),
    /// A line carrying both markers. Its value token is read both ways, and the group starts
    /// before the speedup is recorded.
    GroupStartAndMeasurement(u64, f64),
    /// Anything else.
    Other,
}

impl LogLine {
    /// Classify a line. Each marker phrase is checked on its own, and a line which contains a
    /// marker but whose second-to-last token doesn't have the expected shape is an error.
    pub fn parse(line: &str) -> Result<LogLine, ParseError> {
        let size = if line.contains(GROUP_START_MARKER) { Some(parse_size(line)?) } else { None };
        let speedup =
            if line.contains(MEASUREMENT_MARKER) { Some(parse_speedup(line)?) } else { None };
        Ok(match (size, speedup) {
            (Some(size), Some(speedup)) => LogLine::GroupStartAndMeasurement(size, speedup),
            (Some(size), None) => LogLine::GroupStart(size),
            (None, Some(speedup)) => LogLine::Measurement(speedup),
            (None, None) => LogLine::Other,
        })
    }
}

fn parse_size(line: &str) -> Result<u64, ParseError> {
    let token = value_token(line);
    // the size token carries one trailing delimiter, `1024)` or `4,`
    let mut chars = token.chars();
    chars.next_back();
    chars
        .as_str()
        .parse()
        .map_err(|_| ParseError::new(line, Reason::InvalidSize(token.to_owned())))
}

fn parse_speedup(line: &str) -> Result<f64, ParseError> {
    let token = value_token(line);
    token.parse().map_err(|_| ParseError::new(line, Reason::InvalidSpeedup(token.to_owned())))
}

/// The second-to-last whitespace-separated token, which holds the value on both kinds of line.
fn value_token(line: &str) -> &str {
    line.split_whitespace().rev().nth(1).unwrap_or_default()
}

/// A line with a marker phrase which could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line_number}: {reason}: {text:?}")]
pub struct ParseError {
    /// The 1-based number of the offending line, or 0 if it was parsed in isolation.
    pub line_number: usize,
    /// The offending line.
    pub text: String,
    /// What was wrong with it.
    pub reason: Reason,
}

impl ParseError {
    fn new(line: &str, reason: Reason) -> ParseError {
        ParseError { line_number: 0, text: line.trim_end().to_owned(), reason }
    }

    pub(crate) fn at_line(mut self, line_number: usize) -> ParseError {
        self.line_number = line_number;
        self
    }
}

/// The reason a marked line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// The size token isn't an integer followed by a single delimiter.
    InvalidSize(String),
    /// The speedup token isn't a bare floating point literal.
    InvalidSpeedup(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::InvalidSize(token) => write!(f, "invalid problem size {:?}", token),
            Reason::InvalidSpeedup(token) => write!(f, "invalid speedup {:?}", token),
        }
    }
}
