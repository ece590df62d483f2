//! Error types for pool construction.

use thiserror::Error;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur while building a [`crate::Pool`].
#[derive(Error, Debug)]
pub enum PoolError {
    /// A pool must hold at least one free node.
    #[error("invalid pool capacity: {capacity} (must be > 0)")]
    InvalidCapacity {
        /// The capacity that was rejected.
        capacity: usize,
    },

    /// The backing node storage could not be allocated. Nothing is
    /// partially initialized: the pool is not constructed at all.
    #[error("failed to allocate storage for a pool of {capacity} nodes")]
    AllocationFailed {
        /// The capacity that failed to allocate.
        capacity: usize,
    },
}
