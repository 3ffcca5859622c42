use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::job::{Job, JobType};
use crate::scheduler::Scheduler;

/// Round-robin across job types: one FIFO sub-queue per `JobType`, with a
/// rotating cursor that advances one slot after each successful dequeue.
/// A full empty sweep yields `None`; the dispatcher handles the idle wait.
#[derive(Debug)]
pub struct RoundRobinScheduler {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    buckets: HashMap<JobType, VecDeque<Job>>,
    cursor: usize,
}

impl Default for RoundRobinScheduler {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                buckets: JobType::ALL
                    .into_iter()
                    .map(|t| (t, VecDeque::new()))
                    .collect(),
                cursor: 0,
            }),
        }
    }
}

impl RoundRobinScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for RoundRobinScheduler {
    fn on_arrived(&self, job: Job) {
        let mut state = self.state.lock().expect("rr state lock poisoned");
        state
            .buckets
            .get_mut(&job.job_type)
            .expect("bucket exists for every job type")
            .push_back(job);
    }

    fn try_next(&self) -> Option<Job> {
        let mut state = self.state.lock().expect("rr state lock poisoned");
        let n = JobType::ALL.len();
        for i in 0..n {
            let slot = (state.cursor + i) % n;
            let job_type = JobType::ALL[slot];
            if let Some(job) = state
                .buckets
                .get_mut(&job_type)
                .and_then(|q| q.pop_front())
            {
                state.cursor = (slot + 1) % n;
                return Some(job);
            }
        }
        None
    }

    fn on_completed(&self, _job: &Job) {}

    fn name(&self) -> &'static str {
        "round-robin-by-type"
    }
}
