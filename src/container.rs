use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{BalancerError, Result};

/// A replica-holding storage endpoint.
///
/// Every mutation of `storage` happens under `lock`, which is a tokio mutex
/// and therefore FIFO-fair: concurrent workers queue up and are served in
/// acquisition order. `active_ops` counts workers currently inside the lock
/// and is read lock-free by the least-connections picker.
#[derive(Debug)]
pub struct Container {
    pub id: String,
    healthy: AtomicBool,
    lock: Mutex<()>,
    storage: RwLock<HashMap<String, Vec<u8>>>,
    active_ops: AtomicU32,
    total_ops: AtomicU64,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            healthy: AtomicBool::new(true),
            lock: Mutex::new(()),
            storage: RwLock::new(HashMap::new()),
            active_ops: AtomicU32::new(0),
            total_ops: AtomicU64::new(0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    /// Acquire this container's lock, waiting at most `timeout`.
    pub async fn acquire(&self, timeout: Duration) -> Result<MutexGuard<'_, ()>> {
        tokio::time::timeout(timeout, self.lock.lock())
            .await
            .map_err(|_| BalancerError::LockTimeout(self.id.clone()))
    }

    pub fn enter_op(&self) {
        self.active_ops.fetch_add(1, Ordering::AcqRel);
    }

    pub fn exit_op(&self) {
        self.active_ops.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn active_ops(&self) -> u32 {
        self.active_ops.load(Ordering::Acquire)
    }

    pub fn total_ops(&self) -> u64 {
        self.total_ops.load(Ordering::Acquire)
    }

    /// Write a file and count the completed operation.
    /// Caller must hold the container lock.
    pub fn store(&self, filename: &str, payload: Vec<u8>) {
        self.storage
            .write()
            .expect("container storage lock poisoned")
            .insert(filename.to_string(), payload);
        self.total_ops.fetch_add(1, Ordering::AcqRel);
    }

    /// Read a file. Reads do not count towards `total_ops`.
    pub fn read(&self, filename: &str) -> Option<Vec<u8>> {
        self.storage
            .read()
            .expect("container storage lock poisoned")
            .get(filename)
            .cloned()
    }

    /// Remove a file and count the completed operation if it was present.
    /// Caller must hold the container lock.
    pub fn remove(&self, filename: &str) -> bool {
        let removed = self
            .storage
            .write()
            .expect("container storage lock poisoned")
            .remove(filename)
            .is_some();
        if removed {
            self.total_ops.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    pub fn holds(&self, filename: &str) -> bool {
        self.storage
            .read()
            .expect("container storage lock poisoned")
            .contains_key(filename)
    }

    pub fn file_count(&self) -> usize {
        self.storage
            .read()
            .expect("container storage lock poisoned")
            .len()
    }
}

/// The live set of containers, mutated only by the admin plane.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    containers: RwLock<Vec<Arc<Container>>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container. Duplicate ids are rejected.
    pub fn add(&self, container: Arc<Container>) -> Result<()> {
        let mut containers = self.containers.write().expect("registry lock poisoned");
        if containers.iter().any(|c| c.id == container.id) {
            return Err(BalancerError::ContainerExists(container.id.clone()));
        }
        containers.push(container);
        Ok(())
    }

    /// Remove a container by id, returning it so the caller can purge
    /// its catalog entries.
    pub fn remove(&self, id: &str) -> Result<Arc<Container>> {
        let mut containers = self.containers.write().expect("registry lock poisoned");
        let pos = containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BalancerError::UnknownContainer(id.to_string()))?;
        Ok(containers.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<Arc<Container>> {
        self.containers
            .read()
            .expect("registry lock poisoned")
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Arc<Container>> {
        self.containers
            .read()
            .expect("registry lock poisoned")
            .clone()
    }

    /// Snapshot of the healthy containers, in registration order.
    pub fn healthy(&self) -> Vec<Arc<Container>> {
        self.containers
            .read()
            .expect("registry lock poisoned")
            .iter()
            .filter(|c| c.is_healthy())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.containers.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
