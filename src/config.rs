use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ClookError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elevator: String,
    pub queue_depth: usize,
    pub devices: Vec<String>,
    pub max_sector: u64,
}

impl Config {
    pub fn new(devices: Vec<String>) -> Self {
        Self {
            elevator: elevator::CLOOK.to_string(),
            queue_depth: elevator::DEFAULT_QUEUE_DEPTH,
            devices,
            max_sector: 1 << 21, // 1GiB of 512-byte sectors
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.elevator.trim().is_empty() {
            return Err(ClookError::InvalidConfig("elevator name is empty".to_string()));
        }
        if self.queue_depth == 0 {
            return Err(ClookError::InvalidConfig("queue_depth must be at least 1".to_string()));
        }
        if self.devices.is_empty() {
            return Err(ClookError::InvalidConfig("at least one device is required".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.as_str()) {
                return Err(ClookError::InvalidConfig(format!("duplicate device: {}", device)));
            }
        }
        if self.max_sector == 0 {
            return Err(ClookError::InvalidConfig("max_sector must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(vec!["sda".to_string()])
    }
}

impl From<Config> for elevator::ElevatorConfig {
    fn from(config: Config) -> Self {
        elevator::ElevatorConfig {
            queue_depth: config.queue_depth,
        }
    }
}
