//! C-LOOK request ordering.
//!
//! Pending requests form one forward sweep relative to the arm:
//!
//! ```text
//!   [ == arm ... ] [ > arm, ascending ... ] [ < arm, ascending ... ]
//!     at-arm block   ahead segment            behind segment
//! ```
//!
//! Dispatch always takes the front. Once the ahead segment is exhausted the
//! arm jumps back to the lowest pending sector instead of reversing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::request::{Request, RequestId, Sector};
use crate::sequence::RequestSequence;
use crate::trace::TraceEvent;
use crate::{ElevatorConfig, ElevatorError, ElevatorStats, Result};

/// Sector of the most recently dispatched request, or unset before the
/// first dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmPosition(Option<Sector>);

impl ArmPosition {
    pub const UNSET: ArmPosition = ArmPosition(None);

    pub fn at(sector: Sector) -> Self {
        Self(Some(sector))
    }

    pub fn sector(self) -> Option<Sector> {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0.is_some()
    }

    /// With the arm unset every sector classifies as [`Segment::Behind`],
    /// so the queue is plain ascending order until the first dispatch.
    pub fn classify(self, sector: Sector) -> Segment {
        match self.0 {
            Some(arm) if sector > arm => Segment::Ahead,
            Some(arm) if sector == arm => Segment::AtArm,
            _ => Segment::Behind,
        }
    }
}

impl fmt::Display for ArmPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(sector) => write!(f, "{}", sector),
            None => write!(f, "-1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    AtArm,
    Ahead,
    Behind,
}

impl Segment {
    /// Segment of the next queue entry given the segment of the previous one
    /// and the entry's own classification. `None` means the entry would go
    /// back from the behind segment into the ahead segment.
    fn advance(self, class: Segment) -> Option<Segment> {
        match (self, class) {
            (Segment::AtArm, class) => Some(class),
            (Segment::Ahead, Segment::Ahead) => Some(Segment::Ahead),
            (Segment::Ahead, _) => Some(Segment::Behind),
            (Segment::Behind, Segment::Ahead) => None,
            (Segment::Behind, _) => Some(Segment::Behind),
        }
    }
}

/// One C-LOOK scheduler instance. Each device owns its own, arm included.
#[derive(Debug)]
pub struct ClookScheduler {
    config: ElevatorConfig,
    queue: RequestSequence,
    arm: ArmPosition,
    stats: ElevatorStats,
}

impl ClookScheduler {
    pub fn new(config: ElevatorConfig) -> Self {
        Self {
            config,
            queue: RequestSequence::new(),
            arm: ArmPosition::UNSET,
            stats: ElevatorStats::default(),
        }
    }

    pub fn config(&self) -> &ElevatorConfig {
        &self.config
    }

    pub fn arm_position(&self) -> ArmPosition {
        self.arm
    }

    pub fn stats(&self) -> &ElevatorStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn first(&self) -> Option<RequestId> {
        self.queue.front()
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.queue.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RequestId, &Request)> + '_ {
        self.queue.iter()
    }

    /// Pending sectors, front to back.
    pub fn sectors(&self) -> Vec<Sector> {
        self.queue.iter().map(|(_, rq)| rq.sector).collect()
    }

    /// Queues `request` at its sweep position.
    ///
    /// Fails with [`ElevatorError::ResourceExhausted`] when the queue is at
    /// its configured depth or the arena cannot grow; the queue is left as
    /// it was.
    pub fn add_request(&mut self, request: Request) -> Result<RequestId> {
        if self.queue.len() >= self.config.queue_depth {
            return Err(ElevatorError::ResourceExhausted(format!(
                "queue depth {} reached",
                self.config.queue_depth
            )));
        }

        let before = self.insertion_point(request.sector);
        let event = TraceEvent::add(&request);
        let id = self.queue.insert_before(before, request)?;

        self.stats.admitted += 1;
        event.emit();
        debug_assert!(self.is_sweep_ordered(), "sweep order broken by add at {}", event.sector);
        Ok(id)
    }

    /// Pops the next request of the sweep and moves the arm onto it.
    pub fn dispatch(&mut self) -> Option<Request> {
        let request = self.queue.pop_front()?;

        if matches!(self.arm.sector(), Some(prev) if request.sector < prev) {
            self.stats.wraps += 1;
        }
        self.arm = ArmPosition::at(request.sector);
        self.stats.dispatched += 1;

        TraceEvent::dispatch(&request).emit();
        Some(request)
    }

    /// Drops a request that was merged into another one.
    pub fn merged_requests(&mut self, absorbed: RequestId) -> Option<Request> {
        let request = self.queue.remove(absorbed)?;
        self.stats.merged += 1;
        tracing::debug!("Merged away request {} at sector {}", absorbed, request.sector);
        Some(request)
    }

    pub fn former_request(&self, id: RequestId) -> Option<RequestId> {
        self.queue.prev(id)
    }

    pub fn latter_request(&self, id: RequestId) -> Option<RequestId> {
        self.queue.next(id)
    }

    /// Tears the instance down. Pending requests would be lost, so a
    /// non-empty queue is refused.
    pub fn exit(self) -> Result<()> {
        if !self.queue.is_empty() {
            tracing::error!(
                "Elevator exit with {} pending requests (arm at {})",
                self.queue.len(),
                self.arm
            );
            return Err(ElevatorError::InvariantViolation {
                pending: self.queue.len(),
            });
        }
        Ok(())
    }

    /// True when the queue reads as at-arm block, ascending ahead segment,
    /// ascending behind segment.
    pub fn is_sweep_ordered(&self) -> bool {
        let mut phase = Segment::AtArm;
        let mut last: Option<Sector> = None;

        for (_, rq) in self.queue.iter() {
            let class = self.arm.classify(rq.sector);
            let next = match phase.advance(class) {
                Some(next) if next != Segment::Behind || class == Segment::Behind => next,
                _ => return false,
            };
            if next != phase {
                last = None;
            }
            if matches!(last, Some(prev) if rq.sector < prev) {
                return false;
            }
            last = Some(rq.sector);
            phase = next;
        }
        true
    }

    /// Handle of the entry the new sector goes in front of; `None` means
    /// the tail.
    fn insertion_point(&self, sector: Sector) -> Option<RequestId> {
        let incoming = self.arm.classify(sector);
        let mut phase = Segment::AtArm;

        for (id, cur) in self.queue.iter() {
            phase = phase
                .advance(self.arm.classify(cur.sector))
                .unwrap_or(Segment::Behind);

            let stop = match (incoming, phase) {
                // same sector as the arm: right after the at-arm block
                (Segment::AtArm, phase) => phase != Segment::AtArm,
                (Segment::Ahead, Segment::Ahead) => cur.sector > sector,
                // wrap boundary
                (Segment::Ahead, Segment::Behind) => true,
                (Segment::Behind, Segment::Behind) => cur.sector > sector,
                _ => false,
            };
            if stop {
                return Some(id);
            }
        }
        None
    }
}
