pub mod fcfs;
pub mod mlq;
pub mod priority;
pub mod round_robin;
pub mod sjn;

use std::sync::Arc;

pub use fcfs::FcfsScheduler;
pub use mlq::MlqScheduler;
pub use priority::PriorityScheduler;
pub use round_robin::RoundRobinScheduler;
pub use sjn::SjnScheduler;

use crate::error::{BalancerError, Result};
use crate::job::Job;

/// A pluggable ready-queue policy.
///
/// `try_next` is a non-blocking poll; the dispatcher supplies the bounded
/// wait between polls so shutdown stays observable. Implementations
/// guarantee each job handed to `on_arrived` is returned by at most one
/// `try_next` call.
pub trait Scheduler: Send + Sync {
    /// Non-blocking enqueue, callable from many concurrent submitters.
    fn on_arrived(&self, job: Job);

    /// Pop the next job under this policy, or `None` when nothing is ready.
    fn try_next(&self) -> Option<Job>;

    /// Accounting hook invoked after a job finishes, success or failure.
    fn on_completed(&self, job: &Job);

    fn name(&self) -> &'static str;
}

/// Build a scheduler from its admin-plane name.
pub fn by_name(name: &str) -> Result<Arc<dyn Scheduler>> {
    match name.to_ascii_lowercase().as_str() {
        "fcfs" => Ok(Arc::new(FcfsScheduler::new())),
        "sjn" => Ok(Arc::new(SjnScheduler::new())),
        "priority" => Ok(Arc::new(PriorityScheduler::new())),
        "rr" => Ok(Arc::new(RoundRobinScheduler::new())),
        "mlq" => Ok(Arc::new(MlqScheduler::new())),
        other => Err(BalancerError::UnknownScheduler(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_name_resolves_all_policies() {
        for (name, expected) in [
            ("fcfs", "fcfs"),
            ("sjn", "shortest-job-next"),
            ("priority", "priority"),
            ("rr", "round-robin-by-type"),
            ("mlq", "multi-level-queues"),
        ] {
            assert_eq!(by_name(name).unwrap().name(), expected);
        }
        assert!(by_name("srtf").is_err());
    }
}
