//! Reference worker: a command queue, a private node pool, and a dispatch
//! loop over the verbs in [`crate::verb`].

use std::sync::Arc;

use mq_pool::Pool;
use mq_queue::{MpscQueue, Node};

use crate::error::{Result, WorkerError};
use crate::notifier::Notifier;
use crate::verb::{self, decode_peer, result, Peer};

/// Counters a worker accumulates over its lifetime, returned when it stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStats {
    /// Messages dispatched, including the final `STOP`.
    pub processed: u64,
    /// Messages whose verb was not recognised, or that hit a full peer
    /// table.
    pub error_count: u64,
}

/// A worker: owns a command queue other threads enqueue onto, a private
/// pool of nodes it uses to send messages of its own (fan-out, replies),
/// and a table of peers it fans `DO_NOTHING` out to in round robin.
pub struct Worker {
    cmd_queue: Box<MpscQueue>,
    _cmd_stub: Box<Node>,
    pool: Pool,
    notifier: Arc<Notifier>,
    peers: Vec<Peer>,
    max_peers: usize,
    next_peer: usize,
    stats: WorkerStats,
}

impl Worker {
    /// Build a worker with a private pool of `pool_capacity` nodes and
    /// room for up to `max_peers` connections.
    pub fn new(pool_capacity: usize, max_peers: usize) -> Result<Self> {
        let mut stub = Box::new(Node::new());
        let cmd_queue = Box::new(unsafe { MpscQueue::init(stub.as_mut() as *mut Node) });
        let pool = Pool::new(pool_capacity).map_err(WorkerError::Pool)?;
        Ok(Self {
            cmd_queue,
            _cmd_stub: stub,
            pool,
            notifier: Arc::new(Notifier::new()),
            peers: Vec::with_capacity(max_peers),
            max_peers,
            next_peer: 0,
            stats: WorkerStats::default(),
        })
    }

    /// This worker's command queue pointer, for other threads/workers to
    /// enqueue onto.
    pub fn cmd_queue_ptr(&self) -> *mut MpscQueue {
        self.cmd_queue.as_ref() as *const MpscQueue as *mut MpscQueue
    }

    /// This worker's wake-up notifier, for producers to signal after
    /// enqueuing onto its command queue.
    pub fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }

    /// Describe this worker as a [`Peer`] another worker can `CONNECT` to.
    pub fn as_peer(&self) -> Peer {
        Peer::new(self.cmd_queue_ptr(), self.notifier.clone())
    }

    /// Acquire a node from this worker's private pool, for sending a
    /// message of its own (a fan-out `DO_NOTHING`, typically).
    ///
    /// # Safety
    /// The returned node must be enqueued or released exactly once.
    unsafe fn acquire(&self) -> Option<*mut Node> {
        self.pool.acquire()
    }

    fn register_peer(&mut self, peer: Peer) -> u64 {
        if self.peers.len() >= self.max_peers {
            return result::UNKNOWN;
        }
        self.peers.push(peer);
        result::CONNECTED
    }

    /// Send a `DO_NOTHING` to the next peer in round-robin order, if any
    /// peers are registered. No-op (and not an error) with zero peers.
    ///
    /// # Safety
    /// Must only be called from this worker's own consumer loop.
    unsafe fn fan_out_do_nothing(&mut self) {
        if self.peers.is_empty() {
            return;
        }
        let idx = self.next_peer % self.peers.len();
        self.next_peer = (self.next_peer + 1) % self.peers.len();

        let Some(node) = self.acquire() else {
            // Private pool exhausted; drop the fan-out rather than block.
            log::trace!("fan_out_do_nothing: pool exhausted, skipping");
            return;
        };
        (*node).arg1 = verb::DO_NOTHING;
        // No reply_to: the node's own `pool` back-reference already routes
        // it home to this worker's private pool once the peer releases it,
        // with no notifier wake-up required (this worker only re-acquires
        // from its own pool synchronously, inside a future fan-out call, it
        // never blocks waiting for one of these specifically to return).

        let peer = &self.peers[idx];
        (*peer.cmd_queue()).enqueue(node);
        peer.notifier().signal();
    }

    /// Dispatch a single message, returning the reply/result code to stamp
    /// into it.
    ///
    /// # Safety
    /// `node` must point to a valid node owned by this call.
    unsafe fn dispatch(&mut self, node: *mut Node) -> (u64, bool) {
        let verb = (*node).arg1;
        match verb {
            verb::DO_NOTHING => {
                self.fan_out_do_nothing();
                (result::DID_NOTHING, false)
            }
            verb::CONNECT => {
                let peer = decode_peer((*node).arg2);
                (self.register_peer(peer), false)
            }
            verb::DISCONNECT_ALL => {
                self.peers.clear();
                self.next_peer = 0;
                (result::DISCONNECTED, false)
            }
            verb::STOP => (result::STOPPED, true),
            other => {
                log::trace!("dispatch: unrecognised verb {other}");
                (*node).arg2 = other;
                (result::UNKNOWN, false)
            }
        }
    }

    /// Run the consumer loop: wait for work, dispatch it, reply or
    /// release it, repeat until a `STOP` message is processed. Returns the
    /// accumulated stats.
    pub fn run(mut self) -> WorkerStats {
        loop {
            self.notifier.wait();
            let Some(node) = (unsafe { self.cmd_queue.dequeue_stalling() }) else {
                continue;
            };
            let (code, should_stop) = unsafe { self.dispatch(node) };
            self.stats.processed += 1;
            if code == result::UNKNOWN {
                self.stats.error_count += 1;
            }
            unsafe { mq_pool::reply_or_release(node, code) };

            if should_stop {
                return self.flush_and_shutdown();
            }
        }
    }

    /// Drain any remaining queued messages (releasing/replying each one
    /// without further dispatch, matching the worker's own shutdown
    /// semantics) and deinitialize the command queue and pool.
    fn flush_and_shutdown(mut self) -> WorkerStats {
        while let Some(node) = unsafe { self.cmd_queue.dequeue_non_stalling() } {
            self.stats.processed += 1;
            unsafe { mq_pool::reply_or_release(node, result::STOPPED) };
        }
        let (_processed, residual) = unsafe { self.cmd_queue.deinit() };
        if let Some(stub) = residual {
            // The surrendered stub is this worker's own _cmd_stub; nothing
            // further to release, it's reclaimed when `self` drops.
            debug_assert_eq!(stub, self._cmd_stub.as_mut() as *mut Node);
        }
        unsafe { self.pool.deinit() };
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verb::encode_peer;

    fn send(worker: &Worker, verb: u64, arg2: u64, reply_to: Option<*mut MpscQueue>) {
        unsafe {
            let n = worker.pool.acquire().expect("pool has room for the test");
            (*n).arg1 = verb;
            (*n).arg2 = arg2;
            (*n).set_reply_to(reply_to);
            worker.cmd_queue.enqueue(n);
        }
        worker.notifier.signal();
    }

    #[test]
    fn stop_with_no_other_traffic_shuts_down_cleanly() {
        let worker = Worker::new(4, 2).unwrap();
        send(&worker, verb::STOP, 0, None);
        let stats = worker.run();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.error_count, 0);
    }

    #[test]
    fn unknown_verb_is_counted_as_an_error() {
        let worker = Worker::new(4, 2).unwrap();
        send(&worker, 99, 0, None);
        send(&worker, verb::STOP, 0, None);
        let stats = worker.run();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.error_count, 1);
    }

    #[test]
    fn unknown_verb_reply_carries_original_verb_in_arg2() {
        let worker = Worker::new(4, 2).unwrap();

        let mut reply_stub = Box::new(Node::new());
        let reply_q = unsafe { MpscQueue::init(reply_stub.as_mut() as *mut Node) };

        send(
            &worker,
            99,
            0,
            Some(&reply_q as *const MpscQueue as *mut MpscQueue),
        );
        send(&worker, verb::STOP, 0, None);
        worker.run();

        let reply = unsafe { reply_q.dequeue_stalling() }.expect("unknown-verb reply landed");
        assert_eq!(unsafe { (*reply).arg1 }, result::UNKNOWN);
        assert_eq!(unsafe { (*reply).arg2 }, 99, "original verb preserved in arg2");
    }

    #[test]
    fn connect_registers_a_peer_and_replies_on_request() {
        let worker = Worker::new(4, 2).unwrap();

        let mut reply_stub = Box::new(Node::new());
        let reply_q = unsafe { MpscQueue::init(reply_stub.as_mut() as *mut Node) };
        let reply_notifier = Arc::new(Notifier::new());

        let peer = Peer::new(
            &reply_q as *const MpscQueue as *mut MpscQueue,
            reply_notifier,
        );
        let encoded = encode_peer(peer);
        send(
            &worker,
            verb::CONNECT,
            encoded,
            Some(&reply_q as *const MpscQueue as *mut MpscQueue),
        );
        send(&worker, verb::STOP, 0, None);
        let stats = worker.run();
        assert_eq!(stats.processed, 2);

        let reply = unsafe { reply_q.dequeue_stalling() }.expect("connect reply landed");
        assert_eq!(unsafe { (*reply).arg1 }, result::CONNECTED);
    }

    #[test]
    fn connect_beyond_capacity_reports_unknown() {
        let worker = Worker::new(8, 1).unwrap();
        let mut stubs: Vec<Box<Node>> = Vec::new();
        let mut queues: Vec<Box<MpscQueue>> = Vec::new();

        for _ in 0..2 {
            let mut stub = Box::new(Node::new());
            let q = Box::new(unsafe { MpscQueue::init(stub.as_mut() as *mut Node) });
            stubs.push(stub);
            queues.push(q);
        }

        for q in &queues {
            let peer = Peer::new(
                q.as_ref() as *const MpscQueue as *mut MpscQueue,
                Arc::new(Notifier::new()),
            );
            send(&worker, verb::CONNECT, encode_peer(peer), None);
        }
        send(&worker, verb::STOP, 0, None);
        let stats = worker.run();
        assert_eq!(stats.error_count, 1, "second connect should exceed capacity 1");
    }
}
