use serde::{Deserialize, Serialize};
use std::fmt;

pub type Sector = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    pub fn as_char(self) -> char {
        match self {
            Direction::Read => 'R',
            Direction::Write => 'W',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' | 'r' => Some(Direction::Read),
            'W' | 'w' => Some(Direction::Write),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A block I/O request as seen by the scheduler.
///
/// Only `sector` takes part in ordering; `direction` and `nr_sectors` ride
/// along for the trace and the dispatch sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub sector: Sector,
    pub nr_sectors: u32,
    pub direction: Direction,
}

impl Request {
    pub fn new(direction: Direction, sector: Sector) -> Self {
        Self {
            sector,
            nr_sectors: 1,
            direction,
        }
    }

    pub fn read(sector: Sector) -> Self {
        Self::new(Direction::Read, sector)
    }

    pub fn write(sector: Sector) -> Self {
        Self::new(Direction::Write, sector)
    }

    pub fn with_len(mut self, nr_sectors: u32) -> Self {
        self.nr_sectors = nr_sectors;
        self
    }

    /// First sector past the end of this request.
    pub fn end_sector(&self) -> Sector {
        self.sector.saturating_add(u64::from(self.nr_sectors))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sector, self.direction)
    }
}

/// Handle to a request admitted into one scheduler instance.
///
/// The generation makes handles of dispatched or merged requests stale
/// once their slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}
