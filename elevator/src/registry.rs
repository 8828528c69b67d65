use std::collections::BTreeMap;

use crate::clook::ClookScheduler;
use crate::request::{Request, RequestId, Sector};
use crate::{ElevatorConfig, ElevatorError, ElevatorStats, Result, CLOOK};

/// Operations the block layer calls on an I/O scheduler.
///
/// Callers serialize access per device; implementations are not re-entrant.
pub trait Elevator: Send {
    fn name(&self) -> &'static str;

    fn add_request(&mut self, request: Request) -> Result<RequestId>;

    fn dispatch(&mut self) -> Option<Request>;

    fn merged_requests(&mut self, absorbed: RequestId) -> Option<Request>;

    fn former_request(&self, id: RequestId) -> Option<RequestId>;

    fn latter_request(&self, id: RequestId) -> Option<RequestId>;

    fn first(&self) -> Option<RequestId>;

    fn request(&self, id: RequestId) -> Option<&Request>;

    /// Sector of the last dispatched request, if any.
    fn head_position(&self) -> Option<Sector>;

    fn stats(&self) -> ElevatorStats;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn exit(self: Box<Self>) -> Result<()>;
}

impl Elevator for ClookScheduler {
    fn name(&self) -> &'static str {
        CLOOK
    }

    fn add_request(&mut self, request: Request) -> Result<RequestId> {
        ClookScheduler::add_request(self, request)
    }

    fn dispatch(&mut self) -> Option<Request> {
        ClookScheduler::dispatch(self)
    }

    fn merged_requests(&mut self, absorbed: RequestId) -> Option<Request> {
        ClookScheduler::merged_requests(self, absorbed)
    }

    fn former_request(&self, id: RequestId) -> Option<RequestId> {
        ClookScheduler::former_request(self, id)
    }

    fn latter_request(&self, id: RequestId) -> Option<RequestId> {
        ClookScheduler::latter_request(self, id)
    }

    fn first(&self) -> Option<RequestId> {
        ClookScheduler::first(self)
    }

    fn request(&self, id: RequestId) -> Option<&Request> {
        ClookScheduler::request(self, id)
    }

    fn head_position(&self) -> Option<Sector> {
        self.arm_position().sector()
    }

    fn stats(&self) -> ElevatorStats {
        ClookScheduler::stats(self).clone()
    }

    fn len(&self) -> usize {
        ClookScheduler::len(self)
    }

    fn exit(self: Box<Self>) -> Result<()> {
        ClookScheduler::exit(*self)
    }
}

pub type ElevatorFactory = fn(&ElevatorConfig) -> Box<dyn Elevator>;

fn clook_factory(config: &ElevatorConfig) -> Box<dyn Elevator> {
    Box::new(ClookScheduler::new(config.clone()))
}

/// Named elevator types that devices can be attached to.
#[derive(Default)]
pub struct ElevatorRegistry {
    factories: BTreeMap<String, ElevatorFactory>,
}

impl ElevatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the schedulers shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(CLOOK.to_string(), clook_factory);
        registry
    }

    pub fn register(&mut self, name: &str, factory: ElevatorFactory) -> Result<()> {
        if self.factories.contains_key(name) {
            return Err(ElevatorError::AlreadyRegistered(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        tracing::info!("Registered elevator {}", name);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<()> {
        if self.factories.remove(name).is_none() {
            return Err(ElevatorError::UnknownElevator(name.to_string()));
        }
        tracing::info!("Unregistered elevator {}", name);
        Ok(())
    }

    pub fn create(&self, name: &str, config: &ElevatorConfig) -> Result<Box<dyn Elevator>> {
        if config.queue_depth == 0 {
            return Err(ElevatorError::InvalidConfig(
                "queue depth must be at least 1".to_string(),
            ));
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ElevatorError::UnknownElevator(name.to_string()))?;
        Ok(factory(config))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
