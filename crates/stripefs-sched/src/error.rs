//! Error types for the per-disk scheduler.

use thiserror::Error;

/// Result type alias for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Error variants for scheduler operations.
///
/// The taxonomy is deliberately narrow: the queue is a closed in-memory
/// algorithm, so the only caller-visible failure is feeding it a priority
/// value that does not name a known class. An empty queue is not an error;
/// `dequeue` and `peek` report it as `None`.
#[derive(Debug, Error)]
pub enum SchedError {
    /// A raw priority value did not map to a known priority class.
    #[error("Invalid priority value: {value}, valid values: 0..={max}")]
    InvalidPriority {
        /// The rejected raw value.
        value: u8,
        /// The highest valid raw value.
        max: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sched_result_alias() {
        let ok: SchedResult<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: SchedResult<i32> = Err(SchedError::InvalidPriority { value: 7, max: 1 });
        assert!(err.is_err());
    }

    #[test]
    fn test_invalid_priority_message() {
        let err = SchedError::InvalidPriority { value: 7, max: 1 };
        assert_eq!(
            format!("{}", err),
            "Invalid priority value: 7, valid values: 0..=1"
        );
    }
}
