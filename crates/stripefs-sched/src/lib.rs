#![warn(missing_docs)]

//! StripeFS per-disk request scheduler.
//!
//! This crate provides the CVSCAN queue used by the StripeFS RAID engine to
//! order pending reads and writes against one physical backing store:
//! shortest-seek-first over a bounded look-ahead window, a directional
//! reversal penalty for SCAN-style hysteresis, preemption of background
//! reconstruction traffic by foreground I/O, and selective promotion of
//! deferred reconstruction requests.
//!
//! The queue is a plain synchronous data structure; the engine wraps each
//! instance in its own lock and drives issuance and completion externally.

pub mod burner;
pub mod error;
pub mod partition;
pub mod queue;
pub mod request;

pub use burner::BackBurner;
pub use error::{SchedError, SchedResult};
pub use partition::{Partition, Side};
pub use queue::{CvscanConfig, CvscanQueue, CvscanStats, DEFAULT_DISK_SECTORS, DEFAULT_WINDOW};
pub use request::{DiskRequest, Priority, PRIORITY_LEVELS};
