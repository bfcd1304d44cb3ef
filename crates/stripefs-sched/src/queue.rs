//! CVSCAN queue controller: cost-window scheduling with direction
//! hysteresis, priority preemption, and promotion of deferred work.
//!
//! One `CvscanQueue` schedules one physical backing store. The policy is
//! shortest-seek-first over a bounded look-ahead window, with a fixed
//! sector-equivalent penalty charged to whichever side would reverse the
//! direction established by the previous dequeue. Foreground (`Normal`)
//! arrivals preempt background (`Low`) work onto the back-burner; specific
//! deferred requests can be promoted back to the foreground by their
//! (stripe, reconstruction-unit) key.
//!
//! The queue is not internally synchronized. Every operation runs to
//! completion without blocking, and the owning engine must serialize calls
//! (one mutex per disk queue).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::burner::BackBurner;
use crate::partition::{Partition, Side};
use crate::request::{DiskRequest, Priority, PRIORITY_LEVELS};

/// Default look-ahead window for cost averaging.
pub const DEFAULT_WINDOW: usize = 2;

/// Default backing-store size used by [`CvscanConfig::default`], in
/// sectors (128 GiB of 512-byte sectors). Real queues are built with
/// [`CvscanConfig::for_disk`] and the actual device size.
pub const DEFAULT_DISK_SECTORS: u64 = 256 * 1024 * 1024;

/// Configuration for a CVSCAN queue. Both values are fixed for the
/// queue's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvscanConfig {
    /// Look-ahead window: how many head entries per side enter the cost sum.
    pub window: usize,
    /// Sector-equivalent cost charged, per window entry, to the side that
    /// would reverse the established direction.
    pub direction_change_penalty: u64,
}

impl CvscanConfig {
    /// Builds the standard configuration for a disk of the given sector
    /// count: window of 2, reversal penalty of one fifth of the disk.
    pub fn for_disk(disk_sectors: u64) -> Self {
        Self {
            window: DEFAULT_WINDOW,
            direction_change_penalty: disk_sectors / 5,
        }
    }
}

impl Default for CvscanConfig {
    fn default() -> Self {
        Self::for_disk(DEFAULT_DISK_SECTORS)
    }
}

/// Statistics for a CVSCAN queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvscanStats {
    /// Total number of requests enqueued by the caller.
    pub enqueued: u64,
    /// Total number of requests returned by `dequeue`.
    pub dequeued: u64,
    /// Number of arrivals parked on the back-burner.
    pub deferred: u64,
    /// Number of preemptions (higher-priority arrival displacing the
    /// active class).
    pub preemptions: u64,
    /// Number of times a deferred class was reactivated after the active
    /// one drained.
    pub reactivations: u64,
    /// Number of requests promoted out of the back-burner.
    pub promoted: u64,
    /// Count per priority level, `Low` first.
    pub per_priority_enqueued: [u64; PRIORITY_LEVELS],
}

impl CvscanStats {
    /// Records an enqueue event for the given priority.
    #[inline]
    pub fn record_enqueue(&mut self, priority: Priority) {
        self.enqueued += 1;
        self.per_priority_enqueued[priority.as_index()] += 1;
    }

    /// Records a dequeue event.
    #[inline]
    pub fn record_dequeue(&mut self) {
        self.dequeued += 1;
    }

    /// Records a back-burner deferral.
    #[inline]
    pub fn record_deferral(&mut self) {
        self.deferred += 1;
    }

    /// Records a preemption event.
    #[inline]
    pub fn record_preemption(&mut self) {
        self.preemptions += 1;
    }

    /// Records a reactivation event.
    #[inline]
    pub fn record_reactivation(&mut self) {
        self.reactivations += 1;
    }

    /// Records a promotion event.
    #[inline]
    pub fn record_promotion(&mut self) {
        self.promoted += 1;
    }
}

/// Per-disk CVSCAN request queue.
///
/// Holds enqueued requests in exactly one of three places: the `left`
/// partition (behind the arm), the `right` partition (at or ahead of it),
/// or the back-burner (below the active priority). Every enqueued request
/// is eventually returned by exactly one `dequeue`; the queue never drops
/// a request and has no cancellation path.
#[derive(Debug)]
pub struct CvscanQueue {
    config: CvscanConfig,
    arm_position: u64,
    direction: Side,
    active_priority: Priority,
    left: Partition,
    right: Partition,
    burner: BackBurner,
    stats: CvscanStats,
}

impl CvscanQueue {
    /// Creates a queue with the given configuration. The arm starts at
    /// sector 0 sweeping toward higher offsets.
    pub fn new(config: CvscanConfig) -> Self {
        debug!(
            "Creating CvscanQueue: window={}, direction_change_penalty={}",
            config.window, config.direction_change_penalty
        );
        Self {
            config,
            arm_position: 0,
            direction: Side::Right,
            active_priority: Priority::Low,
            left: Partition::new(Side::Left),
            right: Partition::new(Side::Right),
            burner: BackBurner::new(),
            stats: CvscanStats::default(),
        }
    }

    /// Creates a queue with the standard configuration for a disk of the
    /// given sector count.
    pub fn for_disk(disk_sectors: u64) -> Self {
        Self::new(CvscanConfig::for_disk(disk_sectors))
    }

    /// Enqueues a request. Routing depends on the currently active
    /// priority class:
    /// - idle queue: the request's class is adopted unconditionally;
    /// - higher than active: the active class is preempted onto the
    ///   back-burner first;
    /// - lower than active: the request is deferred to the back-burner;
    /// - equal: the request is filed spatially into the left or right
    ///   partition relative to the arm.
    pub fn enqueue(&mut self, req: DiskRequest) {
        debug!(
            "Enqueue: offset={}, length={}, priority={}, depth={}",
            req.offset,
            req.length,
            req.priority,
            self.queue_depth()
        );
        self.stats.record_enqueue(req.priority);
        self.file(req);
        self.audit();
    }

    /// Returns the next request to service, or `None` if no request of the
    /// active class is pending. Never blocks, never consults the
    /// back-burner directly: when the last active-class request is popped,
    /// the highest deferred class is reactivated in the same call, so a
    /// subsequent `dequeue` continues seamlessly.
    pub fn dequeue(&mut self) -> Option<DiskRequest> {
        if self.left.is_empty() && self.right.is_empty() {
            return None;
        }
        let side = self.choose_side();
        let req = match side {
            Side::Left => self.left.pop_head(),
            Side::Right => self.right.pop_head(),
        }?;

        self.direction = side;
        self.arm_position = req.end();
        self.stats.record_dequeue();
        self.rebalance();

        debug!(
            "Dequeued: offset={}, side={}, arm={}, remaining={}",
            req.offset,
            side,
            self.arm_position,
            self.left.len() + self.right.len()
        );

        if self.left.is_empty() && self.right.is_empty() && !self.burner.is_empty() {
            self.reactivate_head_class();
        }
        self.audit();
        Some(req)
    }

    /// Returns the request the next `dequeue` would pick, without mutating
    /// any state.
    pub fn peek(&self) -> Option<&DiskRequest> {
        if self.left.is_empty() && self.right.is_empty() {
            return None;
        }
        match self.choose_side() {
            Side::Left => self.left.head(),
            Side::Right => self.right.head(),
        }
    }

    /// Promotes every deferred request matching the given
    /// (stripe, reconstruction-unit) key to `Normal` priority and re-files
    /// it through the normal enqueue path. Returns the number of promoted
    /// entries; zero if nothing matched (the call is idempotent).
    ///
    /// The reconstruction coordinator issues at most one background request
    /// per (stripe, RU) pair, so more than one match indicates a confused
    /// caller; the queue promotes them all anyway and logs a warning.
    pub fn promote(&mut self, stripe_id: u64, reconstruction_unit: u64) -> usize {
        let matches = self.burner.remove_matching(stripe_id, reconstruction_unit);
        let count = matches.len();
        if count > 1 {
            warn!(
                "Promotion matched {} entries for stripe={}, ru={}, expected at most 1",
                count, stripe_id, reconstruction_unit
            );
        }
        for mut req in matches {
            debug!(
                "Promoting: offset={}, stripe={}, ru={}",
                req.offset, stripe_id, reconstruction_unit
            );
            req.priority = Priority::Normal;
            self.stats.record_promotion();
            self.file(req);
        }
        self.audit();
        count
    }

    /// Classifies and files one request; shared by `enqueue`, promotion,
    /// and reactivation.
    fn file(&mut self, req: DiskRequest) {
        if self.left.is_empty() && self.right.is_empty() {
            self.active_priority = req.priority;
        } else if req.priority > self.active_priority {
            self.preempt(req.priority);
        } else if req.priority < self.active_priority {
            debug!(
                "Deferring to burner: offset={}, priority={} < active {}",
                req.offset, req.priority, self.active_priority
            );
            self.stats.record_deferral();
            self.burner.insert(req);
            return;
        }
        if req.offset < self.arm_position {
            self.left.insert(req);
        } else {
            self.right.insert(req);
        }
    }

    /// Moves everything in the spatial partitions onto the back-burner and
    /// raises the active priority.
    fn preempt(&mut self, priority: Priority) {
        debug!(
            "Preempting {} with {}: {} requests to burner",
            self.active_priority,
            priority,
            self.left.len() + self.right.len()
        );
        for req in self.left.drain() {
            self.burner.insert(req);
        }
        for req in self.right.drain() {
            self.burner.insert(req);
        }
        self.active_priority = priority;
        self.stats.record_preemption();
    }

    /// Cost-window side selection, shared by `dequeue` and `peek`.
    ///
    /// The window is clamped to the shorter side so both sums cover the
    /// same number of entries. The side that would reverse the established
    /// direction is charged the configured penalty per window entry; ties
    /// resolve to `Right`.
    fn choose_side(&self) -> Side {
        if self.right.is_empty() {
            return Side::Left;
        }
        if self.left.is_empty() {
            return Side::Right;
        }
        let window = self
            .config
            .window
            .min(self.left.len())
            .min(self.right.len());
        let mut cost_left = self.left.seek_cost(self.arm_position, window);
        let mut cost_right = self.right.seek_cost(self.arm_position, window);
        let penalty = window as u64 * self.config.direction_change_penalty;
        match self.direction {
            Side::Right => cost_left += penalty,
            Side::Left => cost_right += penalty,
        }
        if cost_left < cost_right {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Moves right-partition entries the arm has advanced past into the
    /// left partition, to a fixed point.
    fn rebalance(&mut self) {
        while self
            .right
            .head()
            .is_some_and(|r| r.offset < self.arm_position)
        {
            if let Some(req) = self.right.pop_head() {
                self.left.insert(req);
            }
        }
    }

    /// Pops the highest remaining class off the back-burner and re-files
    /// it through the normal path, repopulating the partitions and setting
    /// the active priority to that class.
    fn reactivate_head_class(&mut self) {
        let batch = self.burner.pop_head_class();
        if batch.is_empty() {
            return;
        }
        debug!(
            "Reactivating {} deferred requests at priority {}",
            batch.len(),
            batch[0].priority
        );
        self.stats.record_reactivation();
        for req in batch {
            self.file(req);
        }
    }

    /// Debug-build consistency audit, run after every mutating operation.
    fn audit(&self) {
        self.left.assert_consistent(self.arm_position);
        self.right.assert_consistent(self.arm_position);
        if self.left.is_empty() && self.right.is_empty() {
            debug_assert!(
                self.burner.is_empty(),
                "idle partitions with non-empty burner"
            );
        } else {
            self.burner.assert_consistent(self.active_priority);
            debug_assert!(
                self.left
                    .iter()
                    .chain(self.right.iter())
                    .all(|r| r.priority == self.active_priority),
                "partition entry not at active priority"
            );
        }
    }

    /// Current arm position in sectors.
    #[inline]
    pub fn arm_position(&self) -> u64 {
        self.arm_position
    }

    /// Direction resolved by the most recent dequeue.
    #[inline]
    pub fn direction(&self) -> Side {
        self.direction
    }

    /// Priority class currently being serviced by the spatial partitions.
    #[inline]
    pub fn active_priority(&self) -> Priority {
        self.active_priority
    }

    /// Number of pending requests behind the arm.
    #[inline]
    pub fn pending_left(&self) -> usize {
        self.left.len()
    }

    /// Number of pending requests at or ahead of the arm.
    #[inline]
    pub fn pending_right(&self) -> usize {
        self.right.len()
    }

    /// Number of requests parked on the back-burner.
    #[inline]
    pub fn deferred(&self) -> usize {
        self.burner.len()
    }

    /// Total number of requests held anywhere in the queue.
    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.left.len() + self.right.len() + self.burner.len()
    }

    /// Returns true if the queue holds no requests at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue_depth() == 0
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &CvscanConfig {
        &self.config
    }

    /// Returns a reference to the queue statistics.
    #[inline]
    pub fn stats(&self) -> &CvscanStats {
        &self.stats
    }
}

impl Default for CvscanQueue {
    fn default() -> Self {
        Self::new(CvscanConfig::default())
    }
}
