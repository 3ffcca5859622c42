use std::time::Duration;

/// Startup parameters for a balancer node.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    /// HTTP API port.
    pub port: u16,
    /// Target replica count for new uploads.
    pub replication_factor: u32,
    /// Tick interval for the health checker.
    pub health_check_interval: Duration,
    /// Hard bound on container lock acquisition.
    pub lock_timeout: Duration,
    /// Container ids registered at startup.
    pub initial_containers: Vec<String>,
    /// Scheduling policy name: fcfs | sjn | priority | rr | mlq.
    pub scheduler: String,
    /// Container selection strategy: rr | least-conn.
    pub picker: String,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            replication_factor: 2,
            health_check_interval: Duration::from_secs(3),
            lock_timeout: Duration::from_secs(15),
            initial_containers: vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
            scheduler: "mlq".to_string(),
            picker: "rr".to_string(),
        }
    }
}

impl BalancerConfig {
    pub fn with_containers(mut self, ids: &[&str]) -> Self {
        self.initial_containers = ids.iter().map(|s| s.to_string()).collect();
        self
    }
}
