//! Response routing: the discipline that lets a worker finish handling a
//! request by either replying to its sender or returning it to its pool.

use mq_queue::Node;

/// Return `node` to the pool it was acquired from.
///
/// If `node.pool()` is `None` the node is externally owned (e.g. a
/// stack-allocated stub); it is dropped silently rather than enqueued
/// anywhere.
///
/// # Safety
/// `node` must point to a valid, currently unqueued [`Node`] that is not
/// concurrently accessed elsewhere.
pub unsafe fn release(node: *mut Node) {
    match (*node).pool() {
        Some(pool) => (*pool).enqueue(node),
        None => log::trace!("release: node has no owning pool, dropping"),
    }
}

/// Finish handling `node`: if it carries a reply target, clear that target,
/// stamp `result_code` into `arg1`, and enqueue it there; otherwise
/// [`release`] it to its pool.
///
/// `reply_to` is consumed exactly once per request — clearing it before the
/// enqueue means the reply can never be mistaken for a new request if it
/// were somehow routed back through here again.
///
/// Notifying the reply queue's consumer (so it wakes from its `Notifier`)
/// is the caller's responsibility; this function only performs the
/// enqueue/release.
///
/// # Safety
/// `node` must point to a valid, currently unqueued [`Node`] that is not
/// concurrently accessed elsewhere.
pub unsafe fn reply_or_release(node: *mut Node, result_code: u64) {
    match (*node).reply_to() {
        Some(target) => {
            (*node).set_reply_to(None);
            (*node).arg1 = result_code;
            (*target).enqueue(node);
        }
        None => release(node),
    }
}
