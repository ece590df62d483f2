//! Two workers connected to each other exchange `DO_NOTHING` fan-out
//! messages and both shut down cleanly on `STOP`.

use std::thread;

use mq_queue::Node;
use mq_worker::{encode_peer, verb, Peer, Worker};

unsafe fn send_raw(queue: *mut mq_queue::MpscQueue, verb: u64, arg2: u64) {
    let node = Box::into_raw(Box::new(Node::new()));
    (*node).arg1 = verb;
    (*node).arg2 = arg2;
    (*queue).enqueue(node);
}

#[test]
fn connected_workers_exchange_do_nothing_and_stop() {
    let a = Worker::new(16, 2).unwrap();
    let b = Worker::new(16, 2).unwrap();

    let a_queue = a.cmd_queue_ptr();
    let a_notifier = a.notifier();
    let b_queue = b.cmd_queue_ptr();
    let b_notifier = b.notifier();

    // Connect a -> b and b -> a by handing each a Peer describing the
    // other, using plain, externally-owned nodes rather than either
    // worker's own pool.
    unsafe {
        send_raw(
            a_queue,
            verb::CONNECT,
            encode_peer(Peer::new(b_queue, b_notifier.clone())),
        );
    }
    a_notifier.signal();

    unsafe {
        send_raw(
            b_queue,
            verb::CONNECT,
            encode_peer(Peer::new(a_queue, a_notifier.clone())),
        );
    }
    b_notifier.signal();

    let handle_a = thread::spawn(move || a.run());
    let handle_b = thread::spawn(move || b.run());

    // Let the two connect messages settle, and a few fan-out rounds run,
    // before stopping both workers.
    thread::sleep(std::time::Duration::from_millis(20));

    unsafe { send_raw(a_queue, verb::STOP, 0) };
    a_notifier.signal();

    unsafe { send_raw(b_queue, verb::STOP, 0) };
    b_notifier.signal();

    let stats_a = handle_a.join().unwrap();
    let stats_b = handle_b.join().unwrap();

    assert!(stats_a.processed >= 1);
    assert!(stats_b.processed >= 1);
}
