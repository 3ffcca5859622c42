//! Cross-policy scheduler properties: exactly-once consumption under
//! concurrent consumers and end-to-end ordering through the trait object.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use filebalancer::job::{Job, JobType};
use filebalancer::scheduler::{self, Scheduler};

fn job(filename: &str, size_kb: u32, priority: u8) -> Job {
    Job::new(JobType::Upload, "u", filename, None, size_kb, priority)
}

/// Every policy must hand each admitted job to at most one consumer, even
/// with several threads polling at once.
#[test]
fn each_job_is_dispatched_at_most_once_under_contention() {
    for name in ["fcfs", "sjn", "priority", "rr", "mlq"] {
        let sched: Arc<dyn Scheduler> = scheduler::by_name(name).unwrap();

        let total = 200;
        for i in 0..total {
            sched.on_arrived(job(&format!("u:f{i}"), 1 + i % 7, (i % 11) as u8));
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let sched = sched.clone();
            handles.push(thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(job) = sched.try_next() {
                    seen.push(job.id);
                }
                seen
            }));
        }

        let mut all_ids = Vec::new();
        for handle in handles {
            all_ids.extend(handle.join().unwrap());
        }

        let distinct: HashSet<_> = all_ids.iter().collect();
        assert_eq!(
            distinct.len(),
            all_ids.len(),
            "{name}: a job was dispatched twice"
        );
        assert_eq!(all_ids.len() as u32, total, "{name}: a job was lost");
        assert!(sched.try_next().is_none(), "{name}: queue should be empty");
    }
}

#[test]
fn fcfs_preserves_total_arrival_order() {
    let sched = scheduler::by_name("fcfs").unwrap();
    for i in 0..20 {
        sched.on_arrived(job(&format!("u:f{i:02}"), 1, 5));
    }
    for i in 0..20 {
        assert_eq!(sched.try_next().unwrap().filename, format!("u:f{i:02}"));
    }
}

#[test]
fn sjn_orders_strictly_by_size_then_arrival() {
    let sched = scheduler::by_name("sjn").unwrap();
    sched.on_arrived(job("u:c", 30, 5));
    sched.on_arrived(job("u:a", 10, 5));
    sched.on_arrived(job("u:b", 10, 5));
    sched.on_arrived(job("u:d", 20, 5));

    let order: Vec<String> = std::iter::from_fn(|| sched.try_next())
        .map(|j| j.filename)
        .collect();
    assert_eq!(order, ["u:a", "u:b", "u:d", "u:c"]);
}

#[test]
fn priority_ignores_submission_order() {
    let sched = scheduler::by_name("priority").unwrap();
    sched.on_arrived(job("u:p3", 1, 3));
    sched.on_arrived(job("u:p9", 1, 9));
    sched.on_arrived(job("u:p0", 1, 0));
    sched.on_arrived(job("u:p7", 1, 7));

    let order: Vec<String> = std::iter::from_fn(|| sched.try_next())
        .map(|j| j.filename)
        .collect();
    assert_eq!(order, ["u:p9", "u:p7", "u:p3", "u:p0"]);
}

#[test]
fn mlq_band_boundaries_match_the_policy() {
    let sched = scheduler::by_name("mlq").unwrap();
    // One job per band boundary: 7 is the top of normal, 8 the bottom of
    // high, 3 the top of low, 4 the bottom of normal.
    sched.on_arrived(job("u:normal-top", 1, 7));
    sched.on_arrived(job("u:low-top", 1, 3));
    sched.on_arrived(job("u:high-bottom", 1, 8));
    sched.on_arrived(job("u:normal-bottom", 1, 4));

    assert_eq!(sched.try_next().unwrap().filename, "u:high-bottom");
    let middle: Vec<String> = (0..2).map(|_| sched.try_next().unwrap().filename).collect();
    assert!(middle.contains(&"u:normal-top".to_string()));
    assert!(middle.contains(&"u:normal-bottom".to_string()));
    assert_eq!(sched.try_next().unwrap().filename, "u:low-top");
}
