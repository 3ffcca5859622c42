use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::container::ContainerRegistry;

/// Periodic health probe over the registered containers.
///
/// Containers are in-process resources here, so the probe body is a
/// scaffold: it only logs the current health census. The health flag
/// itself is flipped by the admin plane, and workers re-read it at
/// placement time.
pub struct HealthChecker {
    registry: Arc<ContainerRegistry>,
    interval: Duration,
}

impl HealthChecker {
    pub fn new(registry: Arc<ContainerRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Spawn the probe loop; it runs until the token is cancelled.
    pub fn start(self, shutdown: CancellationToken) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.probe_all(),
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Health checker stopped");
                        break;
                    }
                }
            }
        });
    }

    fn probe_all(&self) {
        let containers = self.registry.all();
        let healthy = containers.iter().filter(|c| c.is_healthy()).count();
        tracing::debug!(
            healthy,
            total = containers.len(),
            "Health check tick"
        );
    }
}
