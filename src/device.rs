use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use elevator::{Elevator, ElevatorStats, Request, RequestId, Sector};

use crate::error::{ClookError, Result};
use crate::sink::DispatchSink;

/// A block device request queue with its attached elevator.
///
/// All elevator calls go through the queue lock, one at a time.
pub struct Device {
    name: String,
    elevator: Mutex<Box<dyn Elevator>>,
    sink: Arc<dyn DispatchSink>,
}

impl Device {
    pub fn new(name: &str, elevator: Box<dyn Elevator>, sink: Arc<dyn DispatchSink>) -> Self {
        info!("Attached elevator {} to device {}", elevator.name(), name);
        Self {
            name: name.to_string(),
            elevator: Mutex::new(elevator),
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn add_request(&self, request: Request) -> Result<RequestId> {
        let mut elevator = self.elevator.lock().await;
        let id = elevator.add_request(request)?;
        Ok(id)
    }

    /// Moves the next request to the dispatch sink. Returns `false` when
    /// there was nothing queued.
    ///
    /// A request the sink refuses has already left the elevator; it comes
    /// back inside `ClookError::Submit`.
    pub async fn dispatch(&self) -> Result<bool> {
        let request = {
            let mut elevator = self.elevator.lock().await;
            elevator.dispatch()
        };

        let Some(request) = request else {
            return Ok(false);
        };
        if let Err(e) = self.sink.submit(&self.name, request.clone()).await {
            warn!("Sink refused {} on {}: {}", request, self.name, e);
            return Err(ClookError::Submit {
                device: self.name.clone(),
                request,
                source: Box::new(e),
            });
        }
        Ok(true)
    }

    /// Dispatches until the queue is empty and returns how many requests
    /// went out.
    pub async fn drain(&self) -> Result<usize> {
        let mut dispatched = 0;
        while self.dispatch().await? {
            dispatched += 1;
        }
        debug!("Drained {} requests from {}", dispatched, self.name);
        Ok(dispatched)
    }

    pub async fn merge(&self, absorbed: RequestId) -> Option<Request> {
        self.elevator.lock().await.merged_requests(absorbed)
    }

    /// First queued request for `sector`, walking the queue front to back.
    pub async fn find_pending(&self, sector: Sector) -> Option<RequestId> {
        let elevator = self.elevator.lock().await;
        let mut cursor = elevator.first();
        while let Some(id) = cursor {
            if elevator.request(id).map(|rq| rq.sector) == Some(sector) {
                return Some(id);
            }
            cursor = elevator.latter_request(id);
        }
        None
    }

    pub async fn former(&self, id: RequestId) -> Option<RequestId> {
        self.elevator.lock().await.former_request(id)
    }

    pub async fn latter(&self, id: RequestId) -> Option<RequestId> {
        self.elevator.lock().await.latter_request(id)
    }

    pub async fn request(&self, id: RequestId) -> Option<Request> {
        self.elevator.lock().await.request(id).cloned()
    }

    /// Queued sectors in dispatch order.
    pub async fn pending_sectors(&self) -> Vec<Sector> {
        let elevator = self.elevator.lock().await;
        let mut sectors = Vec::with_capacity(elevator.len());
        let mut cursor = elevator.first();
        while let Some(id) = cursor {
            if let Some(rq) = elevator.request(id) {
                sectors.push(rq.sector);
            }
            cursor = elevator.latter_request(id);
        }
        sectors
    }

    pub async fn pending(&self) -> usize {
        self.elevator.lock().await.len()
    }

    pub async fn head_position(&self) -> Option<Sector> {
        self.elevator.lock().await.head_position()
    }

    pub async fn stats(&self) -> ElevatorStats {
        self.elevator.lock().await.stats()
    }

    /// Detaches the elevator. The queue must have been drained first.
    pub async fn shutdown(self) -> Result<()> {
        let elevator = self.elevator.into_inner();
        if let Err(e) = elevator.exit() {
            error!("Device {} shut down with work queued: {}", self.name, e);
            return Err(e.into());
        }
        info!("Device {} shut down", self.name);
        Ok(())
    }
}
