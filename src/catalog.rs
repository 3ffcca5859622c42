use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Authoritative mapping from filename to the set of container ids holding
/// a replica. The catalog stores identities only; containers own their
/// storage and locks.
///
/// All mutations are serialised by one internal mutex; readers get
/// consistent snapshots. Empty location sets are purged so a filename is
/// present iff at least one replica is recorded for it.
#[derive(Debug)]
pub struct FileCatalog {
    locations: Mutex<HashMap<String, BTreeSet<String>>>,
    replication_factor: AtomicU32,
}

impl FileCatalog {
    pub fn new(replication_factor: u32) -> Self {
        Self {
            locations: Mutex::new(HashMap::new()),
            replication_factor: AtomicU32::new(replication_factor.max(1)),
        }
    }

    pub fn replication_factor(&self) -> u32 {
        self.replication_factor.load(Ordering::Acquire)
    }

    /// Change the target replica count for future placements. Existing
    /// placements are never expanded or shrunk retroactively.
    pub fn set_replication_factor(&self, rf: u32) {
        self.replication_factor.store(rf.max(1), Ordering::Release);
    }

    /// Atomically replace the location set for `filename`.
    pub fn place(&self, filename: &str, container_ids: impl IntoIterator<Item = String>) {
        let set: BTreeSet<String> = container_ids.into_iter().collect();
        let mut locations = self.locations.lock().expect("catalog lock poisoned");
        if set.is_empty() {
            locations.remove(filename);
        } else {
            locations.insert(filename.to_string(), set);
        }
    }

    /// Sorted snapshot of the container ids holding `filename`.
    pub fn locations(&self, filename: &str) -> Vec<String> {
        self.locations
            .lock()
            .expect("catalog lock poisoned")
            .get(filename)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.locations
            .lock()
            .expect("catalog lock poisoned")
            .contains_key(filename)
    }

    pub fn add_replica(&self, filename: &str, container_id: &str) {
        self.locations
            .lock()
            .expect("catalog lock poisoned")
            .entry(filename.to_string())
            .or_default()
            .insert(container_id.to_string());
    }

    /// Drop one (filename, container) pair, purging the filename entry
    /// when its set becomes empty.
    pub fn remove_replica(&self, filename: &str, container_id: &str) {
        let mut locations = self.locations.lock().expect("catalog lock poisoned");
        if let Some(set) = locations.get_mut(filename) {
            set.remove(container_id);
            if set.is_empty() {
                locations.remove(filename);
            }
        }
    }

    /// All filenames that list `container_id` as a replica.
    pub fn files_on(&self, container_id: &str) -> Vec<String> {
        self.locations
            .lock()
            .expect("catalog lock poisoned")
            .iter()
            .filter(|(_, set)| set.contains(container_id))
            .map(|(f, _)| f.clone())
            .collect()
    }

    /// Remove every (filename, container) pair for a departing container,
    /// in one critical section so readers never observe a half-purged map.
    pub fn remove_container(&self, container_id: &str) {
        let mut locations = self.locations.lock().expect("catalog lock poisoned");
        locations.retain(|_, set| {
            set.remove(container_id);
            !set.is_empty()
        });
    }

    pub fn file_count(&self) -> usize {
        self.locations.lock().expect("catalog lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replication_factor_has_a_floor_of_one() {
        let catalog = FileCatalog::new(0);
        assert_eq!(catalog.replication_factor(), 1);
        catalog.set_replication_factor(0);
        assert_eq!(catalog.replication_factor(), 1);
        catalog.set_replication_factor(3);
        assert_eq!(catalog.replication_factor(), 3);
    }

    #[test]
    fn place_replaces_previous_set() {
        let catalog = FileCatalog::new(2);
        catalog.place("a.txt", ["c1".to_string(), "c2".to_string()]);
        catalog.place("a.txt", ["c3".to_string()]);
        assert_eq!(catalog.locations("a.txt"), vec!["c3".to_string()]);
    }

    #[test]
    fn empty_sets_are_purged() {
        let catalog = FileCatalog::new(2);
        catalog.add_replica("a.txt", "c1");
        catalog.remove_replica("a.txt", "c1");
        assert!(!catalog.exists("a.txt"));
        assert!(catalog.locations("a.txt").is_empty());
    }

    #[test]
    fn files_on_scans_all_entries() {
        let catalog = FileCatalog::new(2);
        catalog.place("a.txt", ["c1".to_string(), "c2".to_string()]);
        catalog.place("b.txt", ["c2".to_string()]);
        catalog.place("c.txt", ["c3".to_string()]);

        let mut files = catalog.files_on("c2");
        files.sort();
        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn remove_container_purges_all_pairs() {
        let catalog = FileCatalog::new(2);
        catalog.place("a.txt", ["c1".to_string(), "c2".to_string()]);
        catalog.place("b.txt", ["c2".to_string()]);

        catalog.remove_container("c2");
        assert_eq!(catalog.locations("a.txt"), vec!["c1".to_string()]);
        assert!(!catalog.exists("b.txt"));
    }

    #[test]
    fn locations_are_sorted_by_id() {
        let catalog = FileCatalog::new(3);
        catalog.place("a.txt", ["c3".to_string(), "c1".to_string(), "c2".to_string()]);
        assert_eq!(
            catalog.locations("a.txt"),
            vec!["c1".to_string(), "c2".to_string(), "c3".to_string()]
        );
    }
}
