//! Shared helpers for the scheduler test suite.

use elevator::{ArmPosition, ClookScheduler, Direction, Request, Sector};
use proptest::prelude::*;

/// Installs a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// What C-LOOK must dispatch next: the lowest pending sector at or past the
/// arm, otherwise the lowest pending sector overall.
pub fn expected_next(pending: &[Sector], arm: ArmPosition) -> Option<Sector> {
    let lowest = pending.iter().copied().min();
    match arm.sector() {
        Some(arm) => pending
            .iter()
            .copied()
            .filter(|sector| *sector >= arm)
            .min()
            .or(lowest),
        None => lowest,
    }
}

/// Number of strict descents reading front to back.
pub fn descents(sectors: &[Sector]) -> usize {
    sectors.windows(2).filter(|pair| pair[1] < pair[0]).count()
}

/// Requests are tagged through `nr_sectors` so tests can tell equal
/// sectors apart.
pub fn tagged(direction: Direction, sector: Sector, tag: u32) -> Request {
    Request::new(direction, sector).with_len(tag)
}

#[derive(Debug, Clone)]
pub enum Step {
    Admit(Direction, Sector),
    Dispatch,
    /// Merge away the pending request at this position (modulo queue length).
    Merge(usize),
}

pub fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Read), Just(Direction::Write)]
}

/// Small sector range so equal sectors and at-arm admissions are common.
pub fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => (direction(), 0u64..64).prop_map(|(d, s)| Step::Admit(d, s)),
        3 => Just(Step::Dispatch),
        1 => any::<usize>().prop_map(Step::Merge),
    ]
}

pub fn steps(max: usize) -> impl Strategy<Value = Vec<Step>> {
    proptest::collection::vec(step(), 0..max)
}

/// Scheduler with a queue deep enough that admissions never fail.
pub fn unbounded() -> ClookScheduler {
    ClookScheduler::new(elevator::ElevatorConfig::new(usize::MAX))
}
