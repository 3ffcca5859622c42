use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::error::BalancerError;
use crate::job::Job;

/// Observer of job lifecycle transitions.
///
/// Callbacks run synchronously on the dispatcher and worker tasks, so
/// implementations must be non-blocking or offload work themselves. For a
/// single job the callbacks are totally ordered:
/// `on_queued` < `on_started` < (`on_completed` | `on_failed`).
pub trait JobEventListener: Send + Sync {
    fn on_queued(&self, job: &Job);
    fn on_started(&self, job: &Job);
    fn on_completed(&self, job: &Job);
    fn on_failed(&self, job: &Job, error: &BalancerError);
}

/// Fan-out of lifecycle events to registered listeners.
///
/// Listeners are registered once at startup; emission takes a snapshot of
/// the list so registration never blocks a running callback. A panicking
/// listener is logged and never affects the job outcome or its peers.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn JobEventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn JobEventListener>) {
        self.listeners
            .write()
            .expect("listener list lock poisoned")
            .push(listener);
    }

    fn snapshot(&self) -> Vec<Arc<dyn JobEventListener>> {
        self.listeners
            .read()
            .expect("listener list lock poisoned")
            .clone()
    }

    pub fn queued(&self, job: &Job) {
        self.each(job, |l, j| l.on_queued(j));
    }

    pub fn started(&self, job: &Job) {
        self.each(job, |l, j| l.on_started(j));
    }

    pub fn completed(&self, job: &Job) {
        self.each(job, |l, j| l.on_completed(j));
    }

    pub fn failed(&self, job: &Job, error: &BalancerError) {
        for listener in self.snapshot() {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_failed(job, error)));
            if result.is_err() {
                tracing::warn!(job_id = %job.id, "Event listener panicked in on_failed");
            }
        }
    }

    fn each(&self, job: &Job, call: impl Fn(&dyn JobEventListener, &Job)) {
        for listener in self.snapshot() {
            let result = catch_unwind(AssertUnwindSafe(|| call(listener.as_ref(), job)));
            if result.is_err() {
                tracing::warn!(job_id = %job.id, "Event listener panicked");
            }
        }
    }
}

/// Default listener: structured log line per lifecycle transition.
pub struct LoggingListener;

impl JobEventListener for LoggingListener {
    fn on_queued(&self, job: &Job) {
        tracing::info!(job_id = %job.id, job_type = %job.job_type, filename = %job.filename, "Job queued");
    }

    fn on_started(&self, job: &Job) {
        tracing::info!(job_id = %job.id, job_type = %job.job_type, filename = %job.filename, "Job started");
    }

    fn on_completed(&self, job: &Job) {
        tracing::info!(job_id = %job.id, job_type = %job.job_type, filename = %job.filename, "Job completed");
    }

    fn on_failed(&self, job: &Job, error: &BalancerError) {
        tracing::warn!(job_id = %job.id, job_type = %job.job_type, filename = %job.filename, error = %error, "Job failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        queued: AtomicUsize,
        completed: AtomicUsize,
    }

    impl JobEventListener for CountingListener {
        fn on_queued(&self, _job: &Job) {
            self.queued.fetch_add(1, Ordering::SeqCst);
        }
        fn on_started(&self, _job: &Job) {}
        fn on_completed(&self, _job: &Job) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_failed(&self, _job: &Job, _error: &BalancerError) {}
    }

    struct PanickingListener;

    impl JobEventListener for PanickingListener {
        fn on_queued(&self, _job: &Job) {
            panic!("listener bug");
        }
        fn on_started(&self, _job: &Job) {}
        fn on_completed(&self, _job: &Job) {}
        fn on_failed(&self, _job: &Job, _error: &BalancerError) {}
    }

    #[test]
    fn events_reach_every_listener() {
        let bus = EventBus::new();
        let counter = Arc::new(CountingListener::default());
        bus.register(counter.clone());

        let job = Job::new(JobType::Upload, "u", "u:f", None, 1, 5);
        bus.queued(&job);
        bus.completed(&job);

        assert_eq!(counter.queued.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_poison_others() {
        let bus = EventBus::new();
        let counter = Arc::new(CountingListener::default());
        bus.register(Arc::new(PanickingListener));
        bus.register(counter.clone());

        let job = Job::new(JobType::Upload, "u", "u:f", None, 1, 5);
        bus.queued(&job);

        assert_eq!(counter.queued.load(Ordering::SeqCst), 1);
    }
}
