//! A reference worker built on [`mq_queue`] and [`mq_pool`]: a command
//! queue, a private pool, a small verb dispatch table, and round-robin
//! fan-out to connected peers.

pub mod error;
pub mod notifier;
pub mod verb;
pub mod worker;

pub use error::{Result, WorkerError};
pub use notifier::Notifier;
pub use verb::{decode_peer, encode_peer, result, Peer, CONNECT, DISCONNECT_ALL, DO_NOTHING, STOP};
pub use worker::{Worker, WorkerStats};
