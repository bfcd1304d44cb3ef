//! Request and priority types for the per-disk scheduler.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};

/// Priority classes for disk requests.
/// Higher priorities are serviced first; lower classes are parked on the
/// back-burner while a higher class is active.
///
/// The scheduling algorithm only relies on the total order, so adding
/// further levels does not change it; the two-level configuration below is
/// the default the RAID engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    /// Background reconstruction reads/writes.
    Low = 0,
    /// Foreground user I/O.
    Normal = 1,
}

/// Number of priority levels, for per-level counter arrays.
pub const PRIORITY_LEVELS: usize = 2;

impl Priority {
    /// Returns the index for array access (0-based, `Low` first).
    #[inline]
    pub fn as_index(&self) -> usize {
        *self as usize
    }

    /// Maps a raw priority value to a priority class.
    /// This is the boundary where untyped values from the engine's request
    /// descriptors enter the scheduler; anything out of range is rejected
    /// before any queue state is touched.
    pub fn from_raw(value: u8) -> SchedResult<Priority> {
        match value {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::Normal),
            _ => Err(SchedError::InvalidPriority {
                value,
                max: (PRIORITY_LEVELS - 1) as u8,
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Normal => write!(f, "Normal"),
        }
    }
}

/// A single pending request against one physical backing store.
///
/// Offsets and lengths are flat sector values in the caller's coordinate
/// space; the scheduler never interprets them beyond distance arithmetic.
/// `stripe_id` and `reconstruction_unit` are opaque to the scheduler and
/// only consulted by [`CvscanQueue::promote`](crate::queue::CvscanQueue::promote).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiskRequest {
    /// Starting sector of the request.
    pub offset: u64,
    /// Sector count of the request (> 0).
    pub length: u64,
    /// Priority class.
    pub priority: Priority,
    /// Stripe identifier, meaningful only to the RAID layout layer.
    pub stripe_id: u64,
    /// Reconstruction unit identifier, meaningful only to the rebuild loop.
    pub reconstruction_unit: u64,
}

impl DiskRequest {
    /// Creates a request with no reconstruction key (stripe and RU zero).
    pub fn new(offset: u64, length: u64, priority: Priority) -> Self {
        Self {
            offset,
            length,
            priority,
            stripe_id: 0,
            reconstruction_unit: 0,
        }
    }

    /// Attaches the (stripe, reconstruction-unit) key used by promotion.
    pub fn with_rebuild_key(mut self, stripe_id: u64, reconstruction_unit: u64) -> Self {
        self.stripe_id = stripe_id;
        self.reconstruction_unit = reconstruction_unit;
        self
    }

    /// First sector past the end of the request; the arm lands here once
    /// the request has been serviced.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl fmt::Display for DiskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiskRequest({}+{}, {})",
            self.offset, self.length, self.priority
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Normal);
    }

    #[test]
    fn test_priority_as_index() {
        assert_eq!(Priority::Low.as_index(), 0);
        assert_eq!(Priority::Normal.as_index(), 1);
    }

    #[test]
    fn test_priority_from_raw() {
        assert_eq!(Priority::from_raw(0).unwrap(), Priority::Low);
        assert_eq!(Priority::from_raw(1).unwrap(), Priority::Normal);
        assert!(Priority::from_raw(2).is_err());
        assert!(Priority::from_raw(255).is_err());
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(format!("{}", Priority::Low), "Low");
        assert_eq!(format!("{}", Priority::Normal), "Normal");
    }

    #[test]
    fn test_request_end() {
        let req = DiskRequest::new(100, 8, Priority::Normal);
        assert_eq!(req.end(), 108);
    }

    #[test]
    fn test_rebuild_key_builder() {
        let req = DiskRequest::new(0, 1, Priority::Low).with_rebuild_key(3, 1);
        assert_eq!(req.stripe_id, 3);
        assert_eq!(req.reconstruction_unit, 1);
    }

    #[test]
    fn test_request_display() {
        let req = DiskRequest::new(100, 8, Priority::Normal);
        assert_eq!(format!("{}", req), "DiskRequest(100+8, Normal)");
    }
}
