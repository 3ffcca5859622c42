use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::catalog::FileCatalog;
use crate::container::{Container, ContainerRegistry};
use crate::error::{BalancerError, Result};
use crate::events::{EventBus, JobEventListener};
use crate::job::{Job, JobType};
use crate::picker::ContainerPicker;
use crate::scheduler::{self, Scheduler};

/// Bounded wait between scheduler polls, so shutdown is observed promptly
/// even when no jobs arrive.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Decrements a container's `active_ops` gauge on drop, so the count stays
/// balanced even when a worker future is cancelled mid-operation.
struct OpGuard<'a>(&'a Container);

impl<'a> OpGuard<'a> {
    fn enter(container: &'a Container) -> Self {
        container.enter_op();
        Self(container)
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.0.exit_op();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_in_flight: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub scheduler: String,
}

/// The orchestration core: one supervisor task consumes the scheduler and
/// hands each job to an elastic worker pool, which places, reads or
/// deletes replicas against the containers and keeps the catalog current.
pub struct Dispatcher {
    scheduler: RwLock<Arc<dyn Scheduler>>,
    picker: Arc<dyn ContainerPicker>,
    registry: Arc<ContainerRegistry>,
    catalog: Arc<FileCatalog>,
    events: EventBus,
    lock_timeout: Duration,
    arrivals: Notify,
    shutdown: CancellationToken,
    workers: TaskTracker,
    jobs_in_flight: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        picker: Arc<dyn ContainerPicker>,
        registry: Arc<ContainerRegistry>,
        catalog: Arc<FileCatalog>,
        lock_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            scheduler: RwLock::new(scheduler),
            picker,
            registry,
            catalog,
            events: EventBus::new(),
            lock_timeout,
            arrivals: Notify::new(),
            shutdown,
            workers: TaskTracker::new(),
            jobs_in_flight: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
        })
    }

    /// Spawn the dispatch loop.
    pub fn start(self: &Arc<Self>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.run().await;
        });
    }

    /// Stop the dispatch loop, cancel in-flight workers and wait for the
    /// pool to drain.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.workers.close();
        self.workers.wait().await;
    }

    /// Admit a job under the current scheduling policy. Non-blocking;
    /// callable from many concurrent ingress tasks.
    pub fn submit(&self, job: Job) {
        let scheduler = self.current_scheduler();
        self.events.queued(&job);
        scheduler.on_arrived(job);
        self.arrivals.notify_one();
    }

    pub fn register_listener(&self, listener: Arc<dyn JobEventListener>) {
        self.events.register(listener);
    }

    fn current_scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler
            .read()
            .expect("scheduler slot lock poisoned")
            .clone()
    }

    /// Swap the scheduling policy. In-flight jobs finish under the old
    /// scheduler; pending jobs are not migrated.
    pub fn set_scheduler(&self, scheduler: Arc<dyn Scheduler>) {
        let name = scheduler.name();
        *self.scheduler.write().expect("scheduler slot lock poisoned") = scheduler;
        tracing::info!(scheduler = name, "Scheduler replaced");
    }

    pub fn set_scheduler_by_name(&self, name: &str) -> Result<&'static str> {
        let scheduler = scheduler::by_name(name)?;
        let name = scheduler.name();
        self.set_scheduler(scheduler);
        Ok(name)
    }

    pub fn scheduler_name(&self) -> &'static str {
        self.current_scheduler().name()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_in_flight: self.jobs_in_flight.load(Ordering::Acquire),
            jobs_completed: self.jobs_completed.load(Ordering::Acquire),
            jobs_failed: self.jobs_failed.load(Ordering::Acquire),
            scheduler: self.scheduler_name().to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Admin plane
    // ------------------------------------------------------------------

    pub fn add_container(&self, id: &str) -> Result<()> {
        self.registry.add(Arc::new(Container::new(id)))?;
        tracing::info!(container = id, "Container added");
        Ok(())
    }

    /// Remove a container and purge every catalog entry that referenced it.
    pub fn remove_container(&self, id: &str) -> Result<()> {
        let container = self.registry.remove(id)?;
        self.catalog.remove_container(&container.id);
        tracing::info!(container = id, "Container removed");
        Ok(())
    }

    pub fn set_health(&self, id: &str, healthy: bool) -> Result<()> {
        let container = self
            .registry
            .get(id)
            .ok_or_else(|| BalancerError::UnknownContainer(id.to_string()))?;
        container.set_healthy(healthy);
        tracing::info!(container = id, healthy, "Container health updated");
        Ok(())
    }

    pub fn set_replication_factor(&self, rf: u32) {
        self.catalog.set_replication_factor(rf);
        tracing::info!(rf = self.catalog.replication_factor(), "Replication factor updated");
    }

    // ------------------------------------------------------------------
    // Dispatch loop
    // ------------------------------------------------------------------

    async fn run(self: Arc<Self>) {
        tracing::info!(scheduler = self.scheduler_name(), "Dispatcher started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let scheduler = self.current_scheduler();
            match scheduler.try_next() {
                Some(job) => {
                    self.jobs_in_flight.fetch_add(1, Ordering::AcqRel);
                    let dispatcher = self.clone();
                    self.workers.spawn(async move {
                        dispatcher.run_job(scheduler, job).await;
                    });
                }
                None => {
                    let wait = tokio::time::timeout(POLL_INTERVAL, self.arrivals.notified());
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = wait => {}
                    }
                }
            }
        }
        self.workers.close();
        self.workers.wait().await;
        tracing::info!("Dispatcher stopped");
    }

    async fn run_job(&self, scheduler: Arc<dyn Scheduler>, job: Job) {
        self.events.started(&job);

        let result = tokio::select! {
            _ = self.shutdown.cancelled() => Err(BalancerError::Shutdown),
            result = self.execute(&job) => result,
        };

        match &result {
            Ok(()) => {
                self.jobs_completed.fetch_add(1, Ordering::AcqRel);
                self.events.completed(&job);
            }
            Err(error) => {
                self.jobs_failed.fetch_add(1, Ordering::AcqRel);
                tracing::warn!(job_id = %job.id, error = %error, "Job failed");
                self.events.failed(&job, error);
            }
        }

        self.jobs_in_flight.fetch_sub(1, Ordering::AcqRel);
        scheduler.on_completed(&job);
    }

    async fn execute(&self, job: &Job) -> Result<()> {
        match job.job_type {
            JobType::Upload => self.handle_upload(job).await,
            JobType::Download => self.handle_download(job).await,
            JobType::Delete => self.handle_delete(job).await,
        }
    }

    // ------------------------------------------------------------------
    // Execution per job type
    // ------------------------------------------------------------------

    async fn handle_upload(&self, job: &Job) -> Result<()> {
        let healthy = self.registry.healthy();
        if healthy.is_empty() {
            return Err(BalancerError::NoHealthyContainers);
        }

        let rf = (self.catalog.replication_factor() as usize).min(healthy.len());
        let chosen = self.select_replicas(&healthy, rf);

        for container in &chosen {
            let _lock = container.acquire(self.lock_timeout).await?;
            let _op = OpGuard::enter(container);
            self.simulate_io(job).await;
            let payload = job
                .payload
                .clone()
                .unwrap_or_else(|| filler(job.size_kb));
            container.store(&job.filename, payload);
            tracing::debug!(job_id = %job.id, container = %container.id, "Replica written");
        }

        // The catalog commits only after every chosen replica was written:
        // a lock timeout above fails the job and leaves the catalog
        // untouched, orphaning any replicas already written.
        self.catalog
            .place(&job.filename, chosen.iter().map(|c| c.id.clone()));
        Ok(())
    }

    /// Build an ordered, distinct set of `rf` containers. The picker is
    /// consulted first; after `|healthy|` duplicate picks in a row the
    /// selection falls back to the next free container by index, which
    /// bounds the loop and keeps the set distinct.
    fn select_replicas(&self, healthy: &[Arc<Container>], rf: usize) -> Vec<Arc<Container>> {
        let mut chosen: Vec<Arc<Container>> = Vec::with_capacity(rf);
        for i in 0..rf {
            let mut attempts = 0;
            let mut pick = None;
            while attempts < healthy.len() {
                match self.picker.choose(healthy) {
                    Some(c) if !chosen.iter().any(|x| x.id == c.id) => {
                        pick = Some(c);
                        break;
                    }
                    Some(_) => attempts += 1,
                    None => break,
                }
            }
            let next = match pick {
                Some(c) => c,
                None => (i..i + healthy.len())
                    .map(|k| healthy[k % healthy.len()].clone())
                    .find(|c| !chosen.iter().any(|x| x.id == c.id))
                    .expect("rf never exceeds the healthy count"),
            };
            chosen.push(next);
        }
        chosen
    }

    async fn handle_download(&self, job: &Job) -> Result<()> {
        let locations = self.catalog.locations(&job.filename);
        if locations.is_empty() {
            return Err(BalancerError::NotFound(job.filename.clone()));
        }

        // Locations come back sorted by container id, so replica choice is
        // deterministic: first healthy one wins.
        let replica = locations
            .iter()
            .filter_map(|id| self.registry.get(id))
            .find(|c| c.is_healthy())
            .ok_or_else(|| BalancerError::AllReplicasOffline(job.filename.clone()))?;

        let _lock = replica.acquire(self.lock_timeout).await?;
        let _op = OpGuard::enter(&replica);
        self.simulate_io(job).await;
        let data = replica.read(&job.filename).ok_or_else(|| {
            BalancerError::InconsistentReplica(replica.id.clone(), job.filename.clone())
        })?;
        tracing::debug!(
            job_id = %job.id,
            container = %replica.id,
            bytes = data.len(),
            "Replica read"
        );
        Ok(())
    }

    async fn handle_delete(&self, job: &Job) -> Result<()> {
        let locations = self.catalog.locations(&job.filename);
        if locations.is_empty() {
            // Idempotent: deleting an unknown file succeeds.
            return Ok(());
        }

        let mut deleted = 0usize;
        let mut timed_out = None;
        for id in &locations {
            let Some(container) = self.registry.get(id) else {
                // Container left the cluster; its catalog entries were
                // already purged by the admin plane.
                continue;
            };
            if !container.is_healthy() {
                continue;
            }
            match container.acquire(self.lock_timeout).await {
                Ok(_lock) => {
                    let _op = OpGuard::enter(&container);
                    self.simulate_io(job).await;
                    container.remove(&job.filename);
                    drop(_op);
                    drop(_lock);
                    self.catalog.remove_replica(&job.filename, &container.id);
                    deleted += 1;
                }
                Err(BalancerError::LockTimeout(id)) => {
                    tracing::warn!(job_id = %job.id, container = %id, "Skipping locked replica");
                    timed_out = Some(id);
                }
                Err(other) => return Err(other),
            };
        }

        if deleted == 0 {
            return Err(match timed_out {
                Some(id) => BalancerError::LockTimeout(id),
                None => BalancerError::AllReplicasOffline(job.filename.clone()),
            });
        }
        Ok(())
    }

    /// Simulated transfer time, deliberately inside the critical section
    /// so lock contention is observable.
    async fn simulate_io(&self, job: &Job) {
        let ms = u64::from(job.size_kb).saturating_mul(10).max(100);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

fn filler(size_kb: u32) -> Vec<u8> {
    vec![b'x'; size_kb as usize * 1024]
}
