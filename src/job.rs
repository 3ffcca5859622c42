use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    Upload,
    Download,
    Delete,
}

impl JobType {
    /// Fixed iteration order used by the round-robin-by-type scheduler.
    pub const ALL: [JobType; 3] = [JobType::Upload, JobType::Download, JobType::Delete];
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Upload => write!(f, "UPLOAD"),
            JobType::Download => write!(f, "DOWNLOAD"),
            JobType::Delete => write!(f, "DELETE"),
        }
    }
}

/// One unit of work on a named file. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub user: String,
    pub filename: String,
    /// Present for uploads only.
    pub payload: Option<Vec<u8>>,
    /// Used by Shortest-Job-Next and to size the simulated transfer.
    pub size_kb: u32,
    /// 0..=10, used by Priority and MLQ.
    pub priority: u8,
    /// Monotonic arrival timestamp; breaks ties in SJN and Priority.
    pub arrived_at: Instant,
    /// Expected duration in ms, reserved for a future SRTF policy.
    /// Computed as clamp(base + size_kb/2, 1000, 5000) with a random base.
    pub estimated_ms: u64,
}

impl Job {
    pub fn new(
        job_type: JobType,
        user: impl Into<String>,
        filename: impl Into<String>,
        payload: Option<Vec<u8>>,
        size_kb: u32,
        priority: u8,
    ) -> Self {
        let size_kb = size_kb.max(1);
        let base: u64 = rand::thread_rng().gen_range(1000..=5000);
        let estimated_ms = (base + u64::from(size_kb) / 2).clamp(1000, 5000);
        Self {
            id: Uuid::new_v4(),
            job_type,
            user: user.into(),
            filename: filename.into(),
            payload,
            size_kb,
            priority: priority.min(10),
            arrived_at: Instant::now(),
            estimated_ms,
        }
    }
}
