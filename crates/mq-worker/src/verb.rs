//! Command verbs a worker understands, their reply codes, and the
//! peer-handoff payload carried by `connect`.

use mq_queue::MpscQueue;
use std::sync::Arc;

use crate::notifier::Notifier;

/// Do nothing but bounce the message back (to the sender via `reply_to`,
/// or to this worker's own pool otherwise). Used as the steady-state
/// fan-out message between connected workers.
pub const DO_NOTHING: u64 = 0;
/// Register a peer: `arg2` carries an encoded [`Peer`] handed off via
/// [`encode_peer`].
pub const CONNECT: u64 = 1;
/// Forget every registered peer.
pub const DISCONNECT_ALL: u64 = 2;
/// Flush remaining queued work and exit the consumer loop.
pub const STOP: u64 = 3;

/// Reply/result codes stamped into `arg1` before a message is routed back.
pub mod result {
    /// `DO_NOTHING` was handled.
    pub const DID_NOTHING: u64 = 0;
    /// `CONNECT` succeeded.
    pub const CONNECTED: u64 = 1;
    /// `DISCONNECT_ALL` succeeded.
    pub const DISCONNECTED: u64 = 2;
    /// `STOP` was accepted; the worker is shutting down.
    pub const STOPPED: u64 = 3;
    /// The verb in `arg1` was not recognised, or the peer table was full.
    pub const UNKNOWN: u64 = u64::MAX;
}

/// A handle to another worker's command queue and its wake-up `Notifier`,
/// handed off through a `CONNECT` message's `arg2`.
pub struct Peer {
    pub(crate) cmd_queue: *mut MpscQueue,
    pub(crate) notifier: Arc<Notifier>,
}

// `Peer` is only ever moved across threads as a boxed, pointer-encoded
// payload; the queue it points at is itself Send+Sync and outlives every
// worker holding a reference to it for the lifetime of the connection.
unsafe impl Send for Peer {}
unsafe impl Sync for Peer {}

impl Peer {
    /// Describe a peer by its command queue and notifier.
    pub fn new(cmd_queue: *mut MpscQueue, notifier: Arc<Notifier>) -> Self {
        Self { cmd_queue, notifier }
    }

    /// The peer's command queue.
    pub fn cmd_queue(&self) -> *mut MpscQueue {
        self.cmd_queue
    }

    /// The peer's wake-up notifier.
    pub fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }
}

/// Box `peer` and encode the raw pointer as a `u64` suitable for a
/// `CONNECT` message's `arg2`. The receiving worker reclaims ownership via
/// [`decode_peer`].
pub fn encode_peer(peer: Peer) -> u64 {
    Box::into_raw(Box::new(peer)) as u64
}

/// Reclaim a `Peer` previously produced by [`encode_peer`].
///
/// # Safety
/// `encoded` must be a value produced by `encode_peer` that has not
/// already been decoded.
pub unsafe fn decode_peer(encoded: u64) -> Peer {
    *Box::from_raw(encoded as *mut Peer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_peer_round_trips() {
        let notifier = Arc::new(Notifier::new());
        let queue_addr = 0x1234usize as *mut MpscQueue;
        let peer = Peer::new(queue_addr, notifier.clone());
        let encoded = encode_peer(peer);
        let decoded = unsafe { decode_peer(encoded) };
        assert_eq!(decoded.cmd_queue, queue_addr);
        assert_eq!(Arc::strong_count(&notifier), 2);
    }
}
