use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::request::{Direction, Request, Sector};

const PREFIX: &str = "[SCHED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceKind {
    Add,
    Dispatch,
}

impl TraceKind {
    fn tag(self) -> &'static str {
        match self {
            TraceKind::Add => "add",
            TraceKind::Dispatch => "dsp",
        }
    }
}

/// One scheduler trace line.
///
/// Renders as `[SCHED] add R 50` / `[SCHED] dsp W 20`; external tooling
/// parses this exact layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub kind: TraceKind,
    pub direction: Direction,
    pub sector: Sector,
}

impl TraceEvent {
    pub fn add(request: &Request) -> Self {
        Self {
            kind: TraceKind::Add,
            direction: request.direction,
            sector: request.sector,
        }
    }

    pub fn dispatch(request: &Request) -> Self {
        Self {
            kind: TraceKind::Dispatch,
            direction: request.direction,
            sector: request.sector,
        }
    }

    pub(crate) fn emit(&self) {
        tracing::info!(target: "sched", "{}", self);
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", PREFIX, self.kind.tag(), self.direction, self.sector)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed trace line: {0}")]
pub struct ParseTraceError(String);

impl FromStr for TraceEvent {
    type Err = ParseTraceError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let malformed = || ParseTraceError(line.to_string());
        let mut fields = line.split_whitespace();

        if fields.next() != Some(PREFIX) {
            return Err(malformed());
        }
        let kind = match fields.next() {
            Some("add") => TraceKind::Add,
            Some("dsp") => TraceKind::Dispatch,
            _ => return Err(malformed()),
        };
        let direction = match fields.next() {
            Some("R") => Direction::Read,
            Some("W") => Direction::Write,
            _ => return Err(malformed()),
        };
        let sector = fields
            .next()
            .and_then(|s| s.parse::<Sector>().ok())
            .ok_or_else(malformed)?;
        if fields.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            kind,
            direction,
            sector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_compat_lines() {
        assert_eq!(TraceEvent::add(&Request::read(50)).to_string(), "[SCHED] add R 50");
        assert_eq!(TraceEvent::dispatch(&Request::write(20)).to_string(), "[SCHED] dsp W 20");
    }

    #[test]
    fn parses_compat_lines() {
        let event: TraceEvent = "[SCHED] dsp W 20".parse().unwrap();
        assert_eq!(event, TraceEvent::dispatch(&Request::write(20)));

        for bad in ["", "[CLOOK] add R 1", "[SCHED] put R 1", "[SCHED] add X 1", "[SCHED] add R -1", "[SCHED] add R 1 2"] {
            assert!(bad.parse::<TraceEvent>().is_err(), "accepted {:?}", bad);
        }
    }
}
