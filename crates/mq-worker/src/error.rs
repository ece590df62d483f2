//! Error types for worker construction and peer management.

use thiserror::Error;

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors that can occur while building or driving a [`crate::Worker`].
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The worker's private pool could not be allocated.
    #[error("worker pool: {0}")]
    Pool(#[from] mq_pool::PoolError),
}
