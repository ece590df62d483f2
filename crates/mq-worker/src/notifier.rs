//! Producer-wakes-consumer signalling for worker command queues.
//!
//! [`MpscQueue`](mq_queue::MpscQueue) itself never blocks a consumer: its
//! `dequeue_stalling` only spins through the narrow window between a
//! producer's head-swap and its `next`-store. Waiting for a queue to go
//! from *empty* to *has work* is a separate concern, left to the caller by
//! design. [`Notifier`] is that mechanism: a counting semaphore a producer
//! signals after every successful enqueue, and a consumer waits on between
//! drain passes.

use parking_lot::{Condvar, Mutex};

/// A counting semaphore used to wake a worker's consumer loop.
///
/// Counting (rather than boolean) so that signals from multiple producers
/// racing ahead of a busy consumer are never lost: each `signal()` adds
/// one permit, and `wait()` consumes exactly one.
pub struct Notifier {
    count: Mutex<u64>,
    condvar: Condvar,
}

impl Notifier {
    /// Create a `Notifier` with no pending permits.
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Add one permit and wake a single waiter, if any.
    pub fn signal(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.condvar.notify_one();
    }

    /// Block until a permit is available, then consume it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.condvar.wait(&mut count);
        }
        *count -= 1;
    }

    /// Consume a permit if one is immediately available, without blocking.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn try_wait_fails_with_no_pending_signal() {
        let n = Notifier::new();
        assert!(!n.try_wait());
    }

    #[test]
    fn signal_then_wait_consumes_exactly_one_permit() {
        let n = Notifier::new();
        n.signal();
        n.signal();
        assert!(n.try_wait());
        assert!(n.try_wait());
        assert!(!n.try_wait());
    }

    #[test]
    fn wait_blocks_until_signalled() {
        let n = Arc::new(Notifier::new());
        let n2 = n.clone();
        let handle = thread::spawn(move || {
            n2.wait();
        });
        thread::sleep(std::time::Duration::from_millis(20));
        n.signal();
        handle.join().unwrap();
    }
}
