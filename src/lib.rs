pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod sink;
pub mod workload;

pub use config::Config;
pub use controller::Controller;
pub use device::Device;
pub use error::{ClookError, Result};
pub use sink::{DispatchRecord, DispatchSink, NullSink, RecordingSink};
pub use workload::{ReplaySummary, Workload, WorkloadOp};

// Re-export the scheduling core
pub use elevator;
