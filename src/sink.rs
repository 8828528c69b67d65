use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use elevator::Request;

use crate::error::Result;

/// Device-level submission queue that receives requests in dispatch order.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn submit(&self, device: &str, request: Request) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub device: String,
    pub request: Request,
    pub dispatched_at: DateTime<Utc>,
}

/// Keeps every submitted request, in submission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: RwLock<Vec<DispatchRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<DispatchRecord> {
        self.records.read().await.clone()
    }

    pub async fn sectors(&self, device: &str) -> Vec<u64> {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.device == device)
            .map(|record| record.request.sector)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl DispatchSink for RecordingSink {
    async fn submit(&self, device: &str, request: Request) -> Result<()> {
        self.records.write().await.push(DispatchRecord {
            device: device.to_string(),
            request,
            dispatched_at: Utc::now(),
        });
        Ok(())
    }
}

/// Accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl DispatchSink for NullSink {
    async fn submit(&self, _device: &str, _request: Request) -> Result<()> {
        Ok(())
    }
}
