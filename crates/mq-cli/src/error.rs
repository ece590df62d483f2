//! Error handling for the `mq` CLI.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// Worker construction failed (e.g. pool allocation failure).
    #[error("worker error: {0}")]
    Worker(#[from] mq_worker::WorkerError),

    /// Pool construction failed.
    #[error("pool error: {0}")]
    Pool(#[from] mq_pool::PoolError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse error.
    #[error("serialization error: {0}")]
    Serde(#[from] toml::de::Error),

    /// Generic, opaque error.
    #[error("error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Invalid command arguments.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The run completed but its internal bookkeeping did not close: the
    /// messages sent, skipped, and unready-client counts didn't sum to
    /// `loops * client_count`.
    #[error(
        "closure check failed: msgs_sent={msgs_sent} + no_msgs_count={no_msgs_count} \
         != expected={expected}"
    )]
    ClosureMismatch {
        /// Messages successfully handed to a client.
        msgs_sent: u64,
        /// Loop iterations where the shared pool had no free node.
        no_msgs_count: u64,
        /// `loops * client_count`.
        expected: u64,
    },

    /// At least one worker reported a nonzero error count.
    #[error("{count} worker(s) reported a nonzero error count")]
    WorkersReportedErrors {
        /// Number of workers with `error_count > 0`.
        count: usize,
    },
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}
