//! A pool is an [`MpscQueue`] pre-loaded with free nodes: acquiring a node
//! is a dequeue, releasing one is an enqueue. Each node's `pool`
//! back-reference points at the pool's own queue, so release is local —
//! the releasing thread doesn't need to know which pool produced the node.

use mq_queue::{MpscQueue, Node};

use crate::error::{PoolError, Result};

/// A fixed-size collection of free [`Node`]s backed by an [`MpscQueue`].
///
/// Construction allocates `capacity + 1` nodes: node 0 becomes the queue's
/// stub (its `pool` back-reference points at the pool's own queue, so
/// tearing down the pool can't re-home it — see [`Pool::deinit`]), and the
/// remaining `capacity` nodes are enqueued as the initial free list.
pub struct Pool {
    queue: Box<MpscQueue>,
    // Owns every node this pool ever allocated: the stub at index 0, the
    // free list after it. Nodes migrate in and out of `queue` by pointer,
    // but their backing memory always lives here.
    storage: Vec<Box<Node>>,
    capacity: usize,
}

unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    /// Allocate a pool of `capacity` free nodes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity { capacity });
        }

        let mut storage: Vec<Box<Node>> = Vec::new();
        storage
            .try_reserve_exact(capacity + 1)
            .map_err(|_| PoolError::AllocationFailed { capacity })?;

        let mut stub = Box::new(Node::new());
        let stub_ptr = stub.as_mut() as *mut Node;

        // SAFETY: `stub_ptr` is a freshly allocated, exclusively owned node
        // that outlives the queue (both live inside `Pool.storage`/`Pool.queue`).
        let mut queue = Box::new(unsafe { MpscQueue::init(stub_ptr) });
        let queue_ptr = queue.as_mut() as *mut MpscQueue;

        // The stub's pool back-reference can only be set once the queue has
        // its final heap address (the `Box` above), so it happens here
        // rather than at `Node::new()` time.
        stub.set_pool(Some(queue_ptr));
        storage.push(stub);

        for _ in 0..capacity {
            let mut node = Box::new(Node::with_pool(queue_ptr));
            let node_ptr = node.as_mut() as *mut Node;
            // SAFETY: `node_ptr` is fresh, unqueued, and owned by `storage`
            // for the lifetime of the pool.
            unsafe { queue.enqueue(node_ptr) };
            storage.push(node);
        }

        Ok(Self {
            queue,
            storage,
            capacity,
        })
    }

    /// Acquire a free node, or `None` if the pool is currently empty.
    ///
    /// The returned node has `reply_to`, `arg1`, and `arg2` reset to their
    /// zero values, so callers never observe the previous occupant's
    /// payload.
    ///
    /// # Safety
    /// Must only be called from the single thread designated as this
    /// pool's consumer (see [`MpscQueue::dequeue_stalling`]).
    pub unsafe fn acquire(&self) -> Option<*mut Node> {
        let node = self.queue.dequeue_stalling()?;
        (*node).set_reply_to(None);
        (*node).arg1 = 0;
        (*node).arg2 = 0;
        Some(node)
    }

    /// Acquire a free node without spinning through the stall-recovery
    /// window: returns `None` immediately if the queue is either empty or
    /// a producer is mid-enqueue, rather than waiting the producer out.
    ///
    /// # Safety
    /// Same obligations as [`Pool::acquire`].
    pub unsafe fn acquire_non_stalling(&self) -> Option<*mut Node> {
        let node = self.queue.dequeue_non_stalling()?;
        (*node).set_reply_to(None);
        (*node).arg1 = 0;
        (*node).arg2 = 0;
        Some(node)
    }

    /// Number of nodes this pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Advisory count of nodes currently available to acquire.
    pub fn available(&self) -> u64 {
        self.queue.len()
    }

    /// Raw pointer to this pool's underlying queue, for constructing nodes
    /// whose `pool` back-reference should point here (e.g. in tests, or
    /// when building a node set outside of [`Pool::new`]).
    pub fn queue_ptr(&self) -> *mut MpscQueue {
        // `self.queue` is heap-allocated and never moves out from under the
        // `Pool`, so this address is stable for the pool's lifetime.
        &*self.queue as *const MpscQueue as *mut MpscQueue
    }

    /// Tear down the pool: drain every node (yielding while other threads
    /// may still be releasing nodes they acquired earlier), deinitialize
    /// the underlying queue, and free the backing storage.
    ///
    /// # Safety
    /// No other thread may call [`Pool::acquire`] on this pool once
    /// `deinit` has started, and every node ever acquired from this pool
    /// must have been released back to it by the time this returns (or the
    /// loop below spins forever).
    pub unsafe fn deinit(mut self) {
        let mut drained = 0usize;
        while drained < self.capacity {
            match self.queue.dequeue_stalling() {
                Some(_) => drained += 1,
                None => {
                    log::trace!(
                        "pool deinit: waiting on {} outstanding node(s)",
                        self.capacity - drained
                    );
                    std::thread::yield_now();
                }
            }
        }

        let (_processed, residual) = self.queue.deinit();
        debug_assert!(
            residual.is_some(),
            "a pool's bootstrap stub always points at its own queue and must surrender on deinit"
        );
        // `storage` drops here, freeing the stub and every free node.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            Pool::new(0),
            Err(PoolError::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn acquire_drains_exactly_capacity_nodes() {
        let pool = Pool::new(4).unwrap();
        let mut acquired = Vec::new();
        unsafe {
            for _ in 0..4 {
                acquired.push(pool.acquire().expect("node available"));
            }
            assert!(pool.acquire().is_none(), "pool should be exhausted");
            for n in acquired {
                let p = (*n).pool().unwrap();
                (*p).enqueue(n);
            }
        }
        unsafe { pool.deinit() };
    }

    #[test]
    fn acquired_node_has_clean_payload() {
        let pool = Pool::new(1).unwrap();
        unsafe {
            let n = pool.acquire().unwrap();
            assert_eq!((*n).arg1, 0);
            assert_eq!((*n).arg2, 0);
            assert!((*n).reply_to().is_none());
            let p = (*n).pool().unwrap();
            (*p).enqueue(n);
        }
        unsafe { pool.deinit() };
    }

    #[test]
    fn released_node_is_reacquirable() {
        let pool = Pool::new(1).unwrap();
        unsafe {
            let n = pool.acquire().unwrap();
            let pool_ptr = (*n).pool().unwrap();
            (*pool_ptr).enqueue(n);
            let n2 = pool.acquire().expect("released node comes back");
            assert_eq!(n, n2);
        }
        unsafe { pool.deinit() };
    }

    #[test]
    fn deinit_restores_residual_stub() {
        let pool = Pool::new(8).unwrap();
        let mut nodes = Vec::new();
        unsafe {
            for _ in 0..8 {
                nodes.push(pool.acquire().unwrap());
            }
            for n in nodes {
                let p = (*n).pool().unwrap();
                (*p).enqueue(n);
            }
            pool.deinit();
        }
    }
}
