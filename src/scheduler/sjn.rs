use std::sync::Mutex;

use crate::job::Job;
use crate::scheduler::Scheduler;

/// Shortest-Job-Next, non-preemptive: `try_next` returns the pending job
/// with the smallest `size_kb`. Ties go to the earliest arrival, then to
/// the smaller id so the order is total.
#[derive(Debug, Default)]
pub struct SjnScheduler {
    pending: Mutex<Vec<Job>>,
}

impl SjnScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for SjnScheduler {
    fn on_arrived(&self, job: Job) {
        self.pending
            .lock()
            .expect("sjn queue lock poisoned")
            .push(job);
    }

    fn try_next(&self) -> Option<Job> {
        let mut pending = self.pending.lock().expect("sjn queue lock poisoned");
        let best = pending
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.size_kb
                    .cmp(&b.size_kb)
                    .then_with(|| a.arrived_at.cmp(&b.arrived_at))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|(i, _)| i)?;
        Some(pending.swap_remove(best))
    }

    fn on_completed(&self, _job: &Job) {}

    fn name(&self) -> &'static str {
        "shortest-job-next"
    }
}
