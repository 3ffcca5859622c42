use std::collections::VecDeque;
use std::sync::Mutex;

use crate::job::Job;
use crate::scheduler::Scheduler;

/// First-come-first-served: an unbounded FIFO ready queue.
/// Total dispatch order equals arrival order.
#[derive(Debug, Default)]
pub struct FcfsScheduler {
    queue: Mutex<VecDeque<Job>>,
}

impl FcfsScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for FcfsScheduler {
    fn on_arrived(&self, job: Job) {
        self.queue
            .lock()
            .expect("fcfs queue lock poisoned")
            .push_back(job);
    }

    fn try_next(&self) -> Option<Job> {
        self.queue
            .lock()
            .expect("fcfs queue lock poisoned")
            .pop_front()
    }

    fn on_completed(&self, _job: &Job) {}

    fn name(&self) -> &'static str {
        "fcfs"
    }
}
