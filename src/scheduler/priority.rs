use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{self, AtomicU64};
use std::sync::Mutex;

use crate::job::Job;
use crate::scheduler::Scheduler;

/// Non-preemptive priority scheduling: a max-heap on `priority`, ties
/// broken by earliest arrival. There is no aging, so a low-priority job
/// can starve under a steady stream of high-priority arrivals.
#[derive(Debug, Default)]
pub struct PriorityScheduler {
    heap: Mutex<BinaryHeap<Entry>>,
    seq: AtomicU64,
}

#[derive(Debug)]
struct Entry {
    job: Job,
    /// Admission sequence; makes the heap order total when two jobs share
    /// a priority and an arrival instant.
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest entry: rank higher priority above,
        // then earlier arrival, then earlier admission.
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| other.job.arrived_at.cmp(&self.job.arrived_at))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PriorityScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for PriorityScheduler {
    fn on_arrived(&self, job: Job) {
        let seq = self.seq.fetch_add(1, atomic::Ordering::Relaxed);
        self.heap
            .lock()
            .expect("priority heap lock poisoned")
            .push(Entry { job, seq });
    }

    fn try_next(&self) -> Option<Job> {
        self.heap
            .lock()
            .expect("priority heap lock poisoned")
            .pop()
            .map(|e| e.job)
    }

    fn on_completed(&self, _job: &Job) {}

    fn name(&self) -> &'static str {
        "priority"
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
    fn higher_priority_goes_first() {
        let sched = PriorityScheduler::new();
        sched.on_arrived(job("u:low", 1));
        sched.on_arrived(job("u:high", 9));
        sched.on_arrived(job("u:mid", 5));

        assert_eq!(sched.try_next().unwrap().filename, "u:high");
        assert_eq!(sched.try_next().unwrap().filename, "u:mid");
        assert_eq!(sched.try_next().unwrap().filename, "u:low");
    }

    #[test]
    fn equal_priority_falls_back_to_arrival_order() {
        let sched = PriorityScheduler::new();
        sched.on_arrived(job("u:first", 5));
        sched.on_arrived(job("u:second", 5));
        sched.on_arrived(job("u:third", 5));

        assert_eq!(sched.try_next().unwrap().filename, "u:first");
        assert_eq!(sched.try_next().unwrap().filename, "u:second");
        assert_eq!(sched.try_next().unwrap().filename, "u:third");
    }

    #[test]
    fn low_priority_job_starves_under_pressure() {
        // Documented behaviour: no aging.
        let sched = PriorityScheduler::new();
        sched.on_arrived(job("u:starved", 0));
        for i in 0..10 {
            sched.on_arrived(job(&format!("u:hot{i}"), 9));
        }
        for _ in 0..10 {
            assert_eq!(sched.try_next().unwrap().priority, 9);
        }
        assert_eq!(sched.try_next().unwrap().filename, "u:starved");
    }
}
