mod clook;
mod registry;
mod request;
mod sequence;
mod trace;

pub use clook::{ArmPosition, ClookScheduler, Segment};
pub use registry::{Elevator, ElevatorFactory, ElevatorRegistry};
pub use request::{Direction, Request, RequestId, Sector};
pub use sequence::{Iter as SequenceIter, RequestSequence};
pub use trace::{ParseTraceError, TraceEvent, TraceKind};

use serde::{Deserialize, Serialize};

/// Name under which the C-LOOK elevator is registered.
pub const CLOOK: &str = "clook";

/// Default bound on pending requests per scheduler instance.
pub const DEFAULT_QUEUE_DEPTH: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevatorConfig {
    pub queue_depth: usize,
}

impl ElevatorConfig {
    pub fn new(queue_depth: usize) -> Self {
        Self { queue_depth }
    }
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevatorStats {
    pub admitted: u64,
    pub dispatched: u64,
    pub merged: u64,
    pub wraps: u64,
}

pub type Result<T> = std::result::Result<T, ElevatorError>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ElevatorError {
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Invariant violation: scheduler destroyed with {pending} pending requests")]
    InvariantViolation { pending: usize },

    #[error("Elevator already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Unknown elevator: {0}")]
    UnknownElevator(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::collections::TryReserveError> for ElevatorError {
    fn from(err: std::collections::TryReserveError) -> Self {
        ElevatorError::ResourceExhausted(err.to_string())
    }
}
