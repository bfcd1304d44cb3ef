//! Spatially ordered partition lists for the CVSCAN queue.
//!
//! Pending same-priority requests are split into two lists relative to the
//! current arm position: `left` holds requests behind the arm, `right`
//! requests at or ahead of it. Both are kept sorted nearest-to-arm-first so
//! the cost window in the controller only ever looks at list heads.

use core::fmt;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::request::DiskRequest;

/// Which side of the arm a partition (or a dequeue decision) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Offsets below the arm position.
    Left,
    /// Offsets at or above the arm position.
    Right,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "Left"),
            Side::Right => write!(f, "Right"),
        }
    }
}

/// One of the two spatially sorted pending lists.
///
/// `Left` partitions sort by descending offset, `Right` partitions by
/// ascending offset, so the head is always the entry nearest the arm.
/// Requests are owned by the partition while filed; membership in exactly
/// one list at a time is enforced by move semantics rather than intrusive
/// links.
#[derive(Debug, Clone)]
pub struct Partition {
    side: Side,
    entries: VecDeque<DiskRequest>,
}

impl Partition {
    /// Creates an empty partition for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            entries: VecDeque::new(),
        }
    }

    /// Returns which side of the arm this partition covers.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Ordered insertion preserving nearest-to-arm-first order, O(n).
    ///
    /// Tie-break on equal offsets: the new entry is filed ahead of existing
    /// equal-offset entries. This is a deterministic policy, not an
    /// accident of the scan.
    pub fn insert(&mut self, req: DiskRequest) {
        let pos = match self.side {
            Side::Left => self.entries.iter().position(|e| e.offset <= req.offset),
            Side::Right => self.entries.iter().position(|e| e.offset >= req.offset),
        };
        match pos {
            Some(idx) => self.entries.insert(idx, req),
            None => self.entries.push_back(req),
        }
    }

    /// Removes and returns the nearest-to-arm entry.
    #[inline]
    pub fn pop_head(&mut self) -> Option<DiskRequest> {
        self.entries.pop_front()
    }

    /// Returns the nearest-to-arm entry without removing it.
    #[inline]
    pub fn head(&self) -> Option<&DiskRequest> {
        self.entries.front()
    }

    /// Number of pending entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries nearest-to-arm-first.
    pub fn iter(&self) -> impl Iterator<Item = &DiskRequest> + '_ {
        self.entries.iter()
    }

    /// Removes all entries, nearest-to-arm-first. Used when a higher
    /// priority class preempts the one currently filed here.
    pub fn drain(&mut self) -> Vec<DiskRequest> {
        self.entries.drain(..).collect()
    }

    /// Summed seek distance from `arm` over the first `window` entries.
    pub fn seek_cost(&self, arm: u64, window: usize) -> u64 {
        self.entries
            .iter()
            .take(window)
            .map(|e| arm.abs_diff(e.offset))
            .sum()
    }

    /// Debug audit of the spatial invariant relative to `arm`: every entry
    /// on the correct side of the arm, offsets monotone nearest-first.
    /// Compiled out of release builds.
    pub(crate) fn assert_consistent(&self, arm: u64) {
        if cfg!(debug_assertions) {
            let mut prev: Option<u64> = None;
            for entry in &self.entries {
                match self.side {
                    Side::Left => {
                        debug_assert!(
                            entry.offset < arm,
                            "left entry {} not below arm {}",
                            entry.offset,
                            arm
                        );
                        if let Some(p) = prev {
                            debug_assert!(
                                entry.offset <= p,
                                "left partition not descending: {} after {}",
                                entry.offset,
                                p
                            );
                        }
                    }
                    Side::Right => {
                        debug_assert!(
                            entry.offset >= arm,
                            "right entry {} below arm {}",
                            entry.offset,
                            arm
                        );
                        if let Some(p) = prev {
                            debug_assert!(
                                entry.offset >= p,
                                "right partition not ascending: {} after {}",
                                entry.offset,
                                p
                            );
                        }
                    }
                }
                prev = Some(entry.offset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Priority;

    fn req(offset: u64) -> DiskRequest {
        DiskRequest::new(offset, 1, Priority::Normal)
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite(), Side::Left);
    }

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", Side::Left), "Left");
        assert_eq!(format!("{}", Side::Right), "Right");
    }

    #[test]
    fn test_right_sorted_ascending() {
        let mut p = Partition::new(Side::Right);
        p.insert(req(300));
        p.insert(req(100));
        p.insert(req(200));

        assert_eq!(p.pop_head().unwrap().offset, 100);
        assert_eq!(p.pop_head().unwrap().offset, 200);
        assert_eq!(p.pop_head().unwrap().offset, 300);
        assert!(p.pop_head().is_none());
    }

    #[test]
    fn test_left_sorted_descending() {
        let mut p = Partition::new(Side::Left);
        p.insert(req(100));
        p.insert(req(300));
        p.insert(req(200));

        assert_eq!(p.pop_head().unwrap().offset, 300);
        assert_eq!(p.pop_head().unwrap().offset, 200);
        assert_eq!(p.pop_head().unwrap().offset, 100);
    }

    #[test]
    fn test_equal_offset_new_entry_goes_first() {
        let mut p = Partition::new(Side::Right);
        p.insert(req(100).with_rebuild_key(1, 0));
        p.insert(req(100).with_rebuild_key(2, 0));

        assert_eq!(p.pop_head().unwrap().stripe_id, 2);
        assert_eq!(p.pop_head().unwrap().stripe_id, 1);
    }

    #[test]
    fn test_seek_cost_window() {
        let mut p = Partition::new(Side::Right);
        p.insert(req(110));
        p.insert(req(130));
        p.insert(req(500));

        // Only the first two entries fall in the window.
        assert_eq!(p.seek_cost(100, 2), 10 + 30);
        assert_eq!(p.seek_cost(100, 1), 10);
        assert_eq!(p.seek_cost(100, 0), 0);
    }

    #[test]
    fn test_seek_cost_left_side() {
        let mut p = Partition::new(Side::Left);
        p.insert(req(95));
        p.insert(req(80));

        assert_eq!(p.seek_cost(100, 2), 5 + 20);
    }

    #[test]
    fn test_drain_returns_nearest_first() {
        let mut p = Partition::new(Side::Right);
        p.insert(req(200));
        p.insert(req(100));

        let drained = p.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].offset, 100);
        assert_eq!(drained[1].offset, 200);
        assert!(p.is_empty());
    }

    #[test]
    fn test_head_does_not_remove() {
        let mut p = Partition::new(Side::Right);
        p.insert(req(100));
        assert_eq!(p.head().unwrap().offset, 100);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_assert_consistent_passes_for_valid_lists() {
        let mut left = Partition::new(Side::Left);
        left.insert(req(90));
        left.insert(req(50));
        left.assert_consistent(100);

        let mut right = Partition::new(Side::Right);
        right.insert(req(100));
        right.insert(req(150));
        right.assert_consistent(100);
    }
}
