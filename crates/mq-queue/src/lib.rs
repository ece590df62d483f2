//! Wait-free intrusive multi-producer / single-consumer node queue.
//!
//! This is Dmitry Vyukov's non-intrusive MPSC linked-list algorithm
//! (<http://www.1024cores.net/home/lock-free-algorithms/queues/non-intrusive-mpsc-node-based-queue>):
//! any number of producer threads may [`MpscQueue::enqueue`] without
//! blocking each other; exactly one consumer thread may call
//! [`MpscQueue::dequeue_stalling`] / [`MpscQueue::dequeue_non_stalling`].
//! A single atomic exchange on the head pointer orders producers; the
//! consumer observes the resulting list via acquire loads.
//!
//! The queue is never empty in structure: it always holds at least a stub
//! node, which is what lets enqueue complete in one atomic instruction. A
//! consequence of that trick (see [`MpscQueue::dequeue_stalling`]) is that
//! the node handle returned from dequeue is not the node most recently
//! enqueued — it is the former stub, with the new node's payload copied in.
//! Callers must treat a dequeued handle as a value, not an identity.
//!
//! This crate is intentionally dependency-free: the algorithm only needs
//! `core::sync::atomic`. Higher-level pieces (pools, reply routing, worker
//! protocol) live in sibling crates.

#![cfg_attr(not(feature = "std"), no_std)]

use core::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use core::cell::UnsafeCell;
use core::hint;
use core::ptr;

/// An intrusive queue element.
///
/// `Node` carries no payload of its own type parameter: the fields below are
/// exactly what the message-passing fabric built on top of this queue
/// needs, namely a back-pointer to an owning pool and a reply-routing
/// back-pointer plus two 64-bit argument slots. `next`/`pool`/`reply_to` are
/// cache-line aligned the way the original C structure pins
/// `pNext`/`pHead`/`pTail` to their own cache line, to avoid false sharing
/// between the producer writing `next` and the consumer reading it.
#[repr(align(64))]
pub struct Node {
    next: AtomicPtr<Node>,
    /// Queue that owns this node for the purpose of release, or null if the
    /// node is externally owned (e.g. a stack-allocated stub). Set once at
    /// construction and never changed afterwards.
    pool: *mut MpscQueue,
    /// Queue designated to receive the reply variant of this message, or
    /// null. Set by the sender before enqueue, cleared by
    /// `reply_or_release` (in `mq-pool`) before the node is routed.
    reply_to: *mut MpscQueue,
    /// Verb on request, result code on reply.
    pub arg1: u64,
    /// User datum: an integer or an encoded pointer.
    pub arg2: u64,
}

// Nodes cross thread boundaries by design: a producer constructs one, a
// consumer dequeues it, a worker releases it to a pool owned by yet another
// thread. Access is single-writer-at-a-time by the queue's own invariants,
// not by `Node`'s type.
unsafe impl Send for Node {}
unsafe impl Sync for Node {}

impl Node {
    /// Create a node with no owning pool and no reply target. Suitable for
    /// a stack-allocated or array-embedded stub, or for a node whose
    /// lifetime the caller manages directly.
    pub fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            pool: ptr::null_mut(),
            reply_to: ptr::null_mut(),
            arg1: 0,
            arg2: 0,
        }
    }

    /// Create a node whose `pool` back-reference is `pool`. The pointer is
    /// not dereferenced here; it must outlive the node.
    pub fn with_pool(pool: *mut MpscQueue) -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            pool,
            reply_to: ptr::null_mut(),
            arg1: 0,
            arg2: 0,
        }
    }

    /// The queue this node releases to, if any.
    pub fn pool(&self) -> Option<*mut MpscQueue> {
        if self.pool.is_null() {
            None
        } else {
            Some(self.pool)
        }
    }

    /// The queue a reply to this node should land on, if any.
    pub fn reply_to(&self) -> Option<*mut MpscQueue> {
        if self.reply_to.is_null() {
            None
        } else {
            Some(self.reply_to)
        }
    }

    /// Set (or clear, with `None`) the reply-routing target. Callers must
    /// hold exclusive access to the node (it must not currently be queued).
    pub fn set_reply_to(&mut self, target: Option<*mut MpscQueue>) {
        self.reply_to = target.unwrap_or(ptr::null_mut());
    }

    /// Set the `pool` back-reference.
    ///
    /// This exists for pool bootstrap only: a pool's stub node is
    /// allocated before the pool's queue has its final (heap) address, so
    /// the stub's `pool` pointer can't be supplied at construction time.
    /// Once a node has been enqueued anywhere, its `pool` is logically
    /// immutable; callers outside of bootstrap code should treat this as
    /// write-once.
    pub fn set_pool(&mut self, pool: Option<*mut MpscQueue>) {
        self.pool = pool.unwrap_or(ptr::null_mut());
    }

    fn copy_payload_from(&mut self, other: &Node) {
        self.reply_to = other.reply_to;
        self.arg1 = other.arg1;
        self.arg2 = other.arg2;
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

/// Head/tail pair implementing the wait-free MPSC algorithm.
///
/// `head` is touched by every producer (one atomic exchange per enqueue)
/// and by the consumer (one acquire load, only for the emptiness check).
/// `tail` is touched only by the consumer and therefore needs no atomicity
/// of its own, but lives behind an `UnsafeCell` because `MpscQueue` is
/// shared (`&self`) across the producer/consumer boundary.
///
/// Exactly one consumer thread may call the `dequeue_*` methods on a given
/// queue. Running them from two threads concurrently is undefined
/// behaviour — the structure does not defend against it (see `DESIGN.md`
/// for the negative test that exercises this deliberately, under miri/tsan
/// only).
pub struct MpscQueue {
    head: AtomicPtr<Node>,
    tail: UnsafeCell<*mut Node>,
    count: AtomicU64,
    processed: UnsafeCell<u64>,
}

unsafe impl Send for MpscQueue {}
unsafe impl Sync for MpscQueue {}

impl MpscQueue {
    /// Initialize a queue with a caller-owned stub node. The stub must
    /// outlive the queue. `stub.next` is reset to null.
    ///
    /// # Safety
    /// `stub` must point to a valid, exclusively-owned `Node` that will
    /// remain valid for the lifetime of the returned queue.
    pub unsafe fn init(stub: *mut Node) -> Self {
        (*stub).next.store(ptr::null_mut(), Ordering::Release);
        Self {
            head: AtomicPtr::new(stub),
            tail: UnsafeCell::new(stub),
            count: AtomicU64::new(0),
            processed: UnsafeCell::new(0),
        }
    }

    /// Enqueue `node`. Wait-free: always succeeds, never blocks another
    /// producer. May be called from any number of threads concurrently.
    ///
    /// # Safety
    /// `node` must point to a valid `Node` that is not currently enqueued
    /// anywhere else, and must remain valid until it is dequeued.
    pub unsafe fn enqueue(&self, node: *mut Node) {
        (*node).next.store(ptr::null_mut(), Ordering::Release);
        let prev = self.head.swap(node, Ordering::AcqRel);
        (*prev).next.store(node, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Consumer-only. Returns the next node, or `None` if the queue is
    /// empty. May spin (yielding the scheduler) if a producer is preempted
    /// between its head-exchange and its `next`-store.
    ///
    /// # Safety
    /// Must only be called from the single designated consumer thread for
    /// this queue, never concurrently with another `dequeue_*` call.
    pub unsafe fn dequeue_stalling(&self) -> Option<*mut Node> {
        self.dequeue_inner(true)
    }

    /// Consumer-only. Returns `None` both when the queue is empty and when
    /// it would have to wait for a preempted producer — never blocks.
    ///
    /// # Safety
    /// Same requirement as [`Self::dequeue_stalling`].
    pub unsafe fn dequeue_non_stalling(&self) -> Option<*mut Node> {
        self.dequeue_inner(false)
    }

    unsafe fn dequeue_inner(&self, stall: bool) -> Option<*mut Node> {
        let tail = *self.tail.get();
        let mut next = (*tail).next.load(Ordering::Acquire);

        if next.is_null() {
            if tail == self.head.load(Ordering::Acquire) {
                // Queue is genuinely empty.
                return None;
            }
            if !stall {
                return None;
            }
            // A producer swapped `head` but hasn't stored `next` yet.
            // Spin until it does; this is the only blocking point in the
            // queue core.
            loop {
                next = (*tail).next.load(Ordering::Acquire);
                if !next.is_null() {
                    break;
                }
                hint::spin_loop();
                #[cfg(feature = "std")]
                std::thread::yield_now();
            }
        }

        (*tail).copy_payload_from(&*next);
        *self.tail.get() = next;
        *self.processed.get() += 1;
        self.count.fetch_sub(1, Ordering::Relaxed);
        Some(tail)
    }

    /// Advisory running length. Not relied on for correctness.
    pub fn len(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Total nodes successfully dequeued so far.
    ///
    /// # Safety
    /// Must only be read from the consumer thread, or after the consumer
    /// has stopped touching the queue (e.g. during/after `deinit`).
    pub unsafe fn processed(&self) -> u64 {
        *self.processed.get()
    }

    /// Tear down the queue. Assumes the queue is empty (only the stub
    /// remains): callers must drain it first.
    ///
    /// Returns the total processed count and, if the residual stub cannot
    /// re-home itself, the stub for the caller to reclaim. A stub that
    /// belongs to some *other* queue is released there, so the return value
    /// is `None`. A stub that belongs to *this* queue (a pool tearing down
    /// its own bootstrap stub) can't be enqueued back into the queue being
    /// destroyed, so it is surrendered to the caller. A stub with no pool
    /// (e.g. stack-allocated) is likewise surrendered.
    ///
    /// # Safety
    /// The caller must guarantee no other thread touches this queue for the
    /// duration of this call, and that the queue really is drained to just
    /// the stub (an un-drained queue leaks every node still linked past it).
    pub unsafe fn deinit(&mut self) -> (u64, Option<*mut Node>) {
        let stub = *self.tail.get();
        let processed = *self.processed.get();
        let self_ptr = self as *mut MpscQueue;

        let residual = match (*stub).pool() {
            None => Some(stub),
            Some(p) if p == self_ptr => Some(stub),
            Some(p) => {
                (*p).enqueue(stub);
                None
            }
        };

        (processed, residual)
    }
}
