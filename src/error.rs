use elevator::Request;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Elevator error: {0}")]
    Elevator(#[from] elevator::ElevatorError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Workload error at line {line}: {message}")]
    Workload { line: usize, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Dispatch sink error: {0}")]
    Sink(String),

    /// The sink refused a request the elevator had already dispatched.
    /// The request travels back so the caller can re-admit or report it.
    #[error("Submit of {request} to {device} failed: {source}")]
    Submit {
        device: String,
        request: Request,
        #[source]
        source: Box<ClookError>,
    },

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Device still in use: {0}")]
    DeviceBusy(String),
}

pub type Result<T> = std::result::Result<T, ClookError>;
