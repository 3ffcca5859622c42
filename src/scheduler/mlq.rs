use crate::job::Job;
use crate::scheduler::{FcfsScheduler, RoundRobinScheduler, Scheduler, SjnScheduler};

/// Multi-level queues, composed from the other policies:
///
/// - high band (priority >= 8): shortest-job-next, to favour short jobs
/// - normal band (4 <= priority < 8): round-robin by type
/// - low band (priority < 4): FCFS
///
/// Strict priority between bands: `try_next` probes high, then normal,
/// then low.
#[derive(Debug, Default)]
pub struct MlqScheduler {
    high: SjnScheduler,
    normal: RoundRobinScheduler,
    low: FcfsScheduler,
}

impl MlqScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn band(&self, priority: u8) -> &dyn Scheduler {
        if priority >= 8 {
            &self.high
        } else if priority >= 4 {
            &self.normal
        } else {
            &self.low
        }
    }
}

impl Scheduler for MlqScheduler {
    fn on_arrived(&self, job: Job) {
        self.band(job.priority).on_arrived(job);
    }

    fn try_next(&self) -> Option<Job> {
        self.high
            .try_next()
            .or_else(|| self.normal.try_next())
            .or_else(|| self.low.try_next())
    }

    fn on_completed(&self, job: &Job) {
        self.band(job.priority).on_completed(job);
    }

    fn name(&self) -> &'static str {
        "multi-level-queues"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobType;

    fn job(filename: &str, priority: u8) -> Job {
        Job::new(JobType::Upload, "u", filename, None, 1, priority)
    }

    #[test]
    fn bands_are_served_in_strict_priority() {
        let sched = MlqScheduler::new();
        sched.on_arrived(job("u:j1", 2));
        sched.on_arrived(job("u:j2", 6));
        sched.on_arrived(job("u:j3", 9));

        assert_eq!(sched.try_next().unwrap().filename, "u:j3");
        assert_eq!(sched.try_next().unwrap().filename, "u:j2");
        assert_eq!(sched.try_next().unwrap().filename, "u:j1");
        assert!(sched.try_next().is_none());
    }

    #[test]
    fn high_band_orders_by_size() {
        let sched = MlqScheduler::new();
        let mut big = job("u:big", 9);
        big.size_kb = 900;
        let mut small = job("u:small", 8);
        small.size_kb = 1;
        sched.on_arrived(big);
        sched.on_arrived(small);

        assert_eq!(sched.try_next().unwrap().filename, "u:small");
        assert_eq!(sched.try_next().unwrap().filename, "u:big");
    }

    #[test]
    fn band_edges_route_correctly() {
        let sched = MlqScheduler::new();
        sched.on_arrived(job("u:low", 3));
        sched.on_arrived(job("u:normal", 4));
        sched.on_arrived(job("u:high", 8));

        assert_eq!(sched.try_next().unwrap().filename, "u:high");
        assert_eq!(sched.try_next().unwrap().filename, "u:normal");
        assert_eq!(sched.try_next().unwrap().filename, "u:low");
    }
}
