use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use elevator::{ElevatorConfig, ElevatorRegistry};

use crate::config::Config;
use crate::device::Device;
use crate::error::{ClookError, Result};
use crate::sink::DispatchSink;
use crate::workload::{ReplaySummary, Workload};

/// Owns every configured device, each with its own elevator instance.
pub struct Controller {
    config: Config,
    devices: BTreeMap<String, Arc<Device>>,
}

impl Controller {
    pub fn new(config: Config, registry: &ElevatorRegistry, sink: Arc<dyn DispatchSink>) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing {} device(s) with elevator {}",
            config.devices.len(),
            config.elevator
        );

        let elevator_config: ElevatorConfig = config.clone().into();
        let mut devices = BTreeMap::new();
        for name in &config.devices {
            let elevator = registry.create(&config.elevator, &elevator_config)?;
            devices.insert(name.clone(), Arc::new(Device::new(name, elevator, sink.clone())));
        }

        Ok(Self { config, devices })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self, name: &str) -> Result<Arc<Device>> {
        self.devices
            .get(name)
            .cloned()
            .ok_or_else(|| ClookError::UnknownDevice(name.to_string()))
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> + '_ {
        self.devices.values()
    }

    /// Replays `workload` on one device and drains whatever is left.
    pub async fn replay(&self, name: &str, workload: &Workload) -> Result<ReplaySummary> {
        let device = self.device(name)?;
        let mut summary = workload.replay(&device).await?;
        summary.dispatched += device.drain().await?;
        Ok(summary)
    }

    /// Runs an independent random workload on every device concurrently.
    /// Device `i` uses seed `seed + i`.
    pub async fn simulate(&self, requests: usize, seed: u64) -> Result<Vec<(String, ReplaySummary)>> {
        let max_sector = self.config.max_sector;
        let tasks = self.devices.values().enumerate().map(|(i, device)| {
            let device = device.clone();
            let workload = Workload::random(requests, max_sector, seed.wrapping_add(i as u64));
            tokio::spawn(async move {
                let mut summary = workload.replay(&device).await?;
                summary.dispatched += device.drain().await?;
                Ok::<_, ClookError>((device.name().to_string(), summary))
            })
        });

        let joined = futures::future::try_join_all(tasks).await?;
        joined.into_iter().collect()
    }

    /// Detaches every elevator. Fails if a device still has queued work or
    /// is still shared.
    pub async fn shutdown(self) -> Result<()> {
        let mut first_error = None;
        for (name, device) in self.devices {
            let result = match Arc::try_unwrap(device) {
                Ok(device) => device.shutdown().await,
                Err(_) => Err(ClookError::DeviceBusy(name.clone())),
            };
            if let Err(e) = result {
                warn!("Shutdown of {} failed: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    #[tokio::test]
    async fn test_panicked_task_is_a_join_error() {
        let join_err = tokio::spawn(async { panic!("worker died") }).await.unwrap_err();
        let err: ClookError = join_err.into();
        assert!(matches!(err, ClookError::Join(_)), "{}", err);
        assert!(err.to_string().starts_with("Task join error"));
    }

    #[tokio::test]
    async fn test_simulate_reports_every_device() {
        let config = Config::new(vec!["sda".to_string(), "sdb".to_string()]);
        let controller = Controller::new(config, &ElevatorRegistry::with_builtin(), Arc::new(NullSink)).unwrap();

        let results = controller.simulate(50, 3).await.unwrap();
        let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["sda", "sdb"]);
        controller.shutdown().await.unwrap();
    }
}
