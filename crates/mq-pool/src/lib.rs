//! Free-node pools and the request/response routing discipline built on
//! top of [`mq_queue`].
//!
//! A [`Pool`] is an [`mq_queue::MpscQueue`] pre-loaded with a fixed
//! complement of free nodes: acquiring a node is a dequeue, releasing one
//! is an enqueue. [`reply_or_release`] is the terminal step every worker
//! performs when it finishes handling a message: route it back to its
//! sender's reply queue, or return it to the pool it came from.

pub mod error;
pub mod pool;
pub mod routing;

pub use error::{PoolError, Result};
pub use pool::Pool;
pub use routing::{release, reply_or_release};
