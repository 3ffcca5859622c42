use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::container::Container;
use crate::error::{BalancerError, Result};

/// Strategy that selects one container from the healthy candidates.
///
/// The picker is advisory: the dispatcher re-picks (and finally falls back
/// to positional selection) when the replication factor requires distinct
/// containers.
pub trait ContainerPicker: Send + Sync {
    fn choose(&self, healthy: &[Arc<Container>]) -> Option<Arc<Container>>;
    fn name(&self) -> &'static str;
}

/// Build a picker from its admin-plane name.
pub fn by_name(name: &str) -> Result<Arc<dyn ContainerPicker>> {
    match name.to_ascii_lowercase().as_str() {
        "rr" | "round-robin" => Ok(Arc::new(RoundRobinPicker::new())),
        "least-conn" | "least-connections" => Ok(Arc::new(LeastConnectionsPicker)),
        other => Err(BalancerError::UnknownPicker(other.to_string())),
    }
}

/// Rotating cursor over the healthy list. The cursor only ever advances,
/// so concurrent callers each get a distinct slot.
#[derive(Debug, Default)]
pub struct RoundRobinPicker {
    cursor: AtomicUsize,
}

impl RoundRobinPicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContainerPicker for RoundRobinPicker {
    fn choose(&self, healthy: &[Arc<Container>]) -> Option<Arc<Container>> {
        if healthy.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::AcqRel) % healthy.len();
        Some(healthy[i].clone())
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// Picks the container with the fewest in-flight operations,
/// ties broken by id.
#[derive(Debug, Default)]
pub struct LeastConnectionsPicker;

impl ContainerPicker for LeastConnectionsPicker {
    fn choose(&self, healthy: &[Arc<Container>]) -> Option<Arc<Container>> {
        healthy
            .iter()
            .min_by(|a, b| {
                a.active_ops()
                    .cmp(&b.active_ops())
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
    }

    fn name(&self) -> &'static str {
        "least-connections"
    }
}
