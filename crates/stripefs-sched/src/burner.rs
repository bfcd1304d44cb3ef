//! Back-burner list: deferral of below-active-priority requests.
//!
//! While the queue services one priority class, arrivals of any lower class
//! are parked here instead of the spatial partitions. The list is kept in
//! descending priority order, LIFO among equal priorities, so the head run
//! is always the next class to reactivate once the active one drains.

use std::collections::VecDeque;

use crate::request::{DiskRequest, Priority};

/// Priority-ordered holding list for deferred requests.
#[derive(Debug, Clone, Default)]
pub struct BackBurner {
    entries: VecDeque<DiskRequest>,
}

impl BackBurner {
    /// Creates an empty back-burner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered insertion: descending priority, LIFO among equal priorities.
    /// The new entry lands immediately before the first existing entry whose
    /// priority is less than or equal to its own.
    pub fn insert(&mut self, req: DiskRequest) {
        let pos = self
            .entries
            .iter()
            .position(|e| e.priority <= req.priority);
        match pos {
            Some(idx) => self.entries.insert(idx, req),
            None => self.entries.push_back(req),
        }
    }

    /// Pops the maximal head run sharing the single highest remaining
    /// priority, in list order. Empty vec if the burner is empty.
    pub fn pop_head_class(&mut self) -> Vec<DiskRequest> {
        let Some(class) = self.entries.front().map(|e| e.priority) else {
            return Vec::new();
        };
        let mut run = Vec::new();
        while self.entries.front().is_some_and(|e| e.priority == class) {
            if let Some(req) = self.entries.pop_front() {
                run.push(req);
            }
        }
        run
    }

    /// Removes every entry matching the (stripe, reconstruction-unit) key,
    /// preserving the relative order of the matches. Linear scan; the burner
    /// is expected to stay small (one deferred request per in-flight
    /// reconstruction unit).
    pub fn remove_matching(&mut self, stripe_id: u64, reconstruction_unit: u64) -> Vec<DiskRequest> {
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() {
            let hit = self.entries[idx].stripe_id == stripe_id
                && self.entries[idx].reconstruction_unit == reconstruction_unit;
            if hit {
                if let Some(req) = self.entries.remove(idx) {
                    out.push(req);
                }
            } else {
                idx += 1;
            }
        }
        out
    }

    /// Priority of the head entry, i.e. the highest deferred class.
    #[inline]
    pub fn head_priority(&self) -> Option<Priority> {
        self.entries.front().map(|e| e.priority)
    }

    /// Number of deferred entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is deferred.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates deferred entries, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &DiskRequest> + '_ {
        self.entries.iter()
    }

    /// Debug audit: descending priority order, and everything strictly
    /// below `ceiling` (the active priority). Compiled out of release
    /// builds.
    pub(crate) fn assert_consistent(&self, ceiling: Priority) {
        if cfg!(debug_assertions) {
            let mut prev: Option<Priority> = None;
            for entry in &self.entries {
                debug_assert!(
                    entry.priority < ceiling,
                    "burner entry at priority {} not below active {}",
                    entry.priority,
                    ceiling
                );
                if let Some(p) = prev {
                    debug_assert!(
                        entry.priority <= p,
                        "burner not in descending priority order"
                    );
                }
                prev = Some(entry.priority);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(offset: u64, priority: Priority) -> DiskRequest {
        DiskRequest::new(offset, 1, priority)
    }

    #[test]
    fn test_insert_descending_priority() {
        let mut b = BackBurner::new();
        b.insert(req(1, Priority::Low));
        b.insert(req(2, Priority::Normal));

        assert_eq!(b.head_priority(), Some(Priority::Normal));
        let order: Vec<u64> = b.iter().map(|e| e.offset).collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn test_insert_lifo_within_class() {
        let mut b = BackBurner::new();
        b.insert(req(1, Priority::Low));
        b.insert(req(2, Priority::Low));
        b.insert(req(3, Priority::Low));

        let order: Vec<u64> = b.iter().map(|e| e.offset).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_pop_head_class_takes_whole_run() {
        let mut b = BackBurner::new();
        b.insert(req(1, Priority::Low));
        b.insert(req(2, Priority::Normal));
        b.insert(req(3, Priority::Normal));

        let run = b.pop_head_class();
        assert_eq!(run.len(), 2);
        assert!(run.iter().all(|r| r.priority == Priority::Normal));
        assert_eq!(b.len(), 1);
        assert_eq!(b.head_priority(), Some(Priority::Low));
    }

    #[test]
    fn test_pop_head_class_empty() {
        let mut b = BackBurner::new();
        assert!(b.pop_head_class().is_empty());
    }

    #[test]
    fn test_remove_matching_preserves_order() {
        let mut b = BackBurner::new();
        b.insert(req(10, Priority::Low).with_rebuild_key(3, 1));
        b.insert(req(20, Priority::Low).with_rebuild_key(5, 2));
        b.insert(req(30, Priority::Low).with_rebuild_key(3, 1));

        // LIFO ordering puts offset 30 ahead of offset 10.
        let matched = b.remove_matching(3, 1);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].offset, 30);
        assert_eq!(matched[1].offset, 10);

        assert_eq!(b.len(), 1);
        assert_eq!(b.iter().next().unwrap().stripe_id, 5);
    }

    #[test]
    fn test_remove_matching_no_match() {
        let mut b = BackBurner::new();
        b.insert(req(10, Priority::Low).with_rebuild_key(3, 1));
        assert!(b.remove_matching(9, 9).is_empty());
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_assert_consistent_passes() {
        let mut b = BackBurner::new();
        b.insert(req(1, Priority::Low));
        b.insert(req(2, Priority::Low));
        b.assert_consistent(Priority::Normal);
    }
}
