//! The multi-client test driver: spins up `client_count` workers, feeds
//! them `DO_NOTHING` messages drawn from a single shared pool for `loops`
//! rounds (alternating the stalling and non-stalling dequeue on every
//! other round), then stops every worker and checks that the driver's own
//! bookkeeping closes.

use std::sync::Arc;
use std::thread;

use mq_pool::Pool;
use mq_queue::{MpscQueue, Node};
use mq_worker::{encode_peer, verb, Notifier, Peer, Worker, WorkerStats};

use crate::error::{CliError, CliResult};

/// Parameters for one driver run.
#[derive(Debug, Clone, Copy)]
pub struct DriverArgs {
    /// Number of worker "clients" to create.
    pub client_count: u32,
    /// Number of rounds the driver feeds every client a message.
    pub loops: u64,
    /// Size of the shared pool the driver draws messages from (and of
    /// each client's own private pool, for its peer fan-out traffic).
    pub msg_count: u32,
    /// Number of peers each client connects to, round robin. Zero
    /// disables fan-out entirely.
    pub peers: u32,
    /// Seed for the deterministic peer-connection order.
    pub seed: u64,
}

/// Outcome of a driver run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverReport {
    /// Clients successfully created.
    pub clients_created: u32,
    /// Messages the driver successfully handed to a client.
    pub msgs_sent: u64,
    /// Loop iterations where the shared pool had no free node.
    pub no_msgs_count: u64,
    /// Sum of `WorkerStats::processed` across every client.
    pub msgs_processed: u64,
    /// Clients that reported a nonzero error count.
    pub clients_with_errors: usize,
}

/// A tiny xorshift generator, used only to pick a deterministic but
/// varied peer-connection order from `--seed`. Not cryptographic, not
/// meant to be.
struct Xorshift(u64);

impl Xorshift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

unsafe fn send(queue: *mut MpscQueue, notifier: &Notifier, verb: u64, arg2: u64) {
    let node = Box::into_raw(Box::new(Node::new()));
    (*node).arg1 = verb;
    (*node).arg2 = arg2;
    (*queue).enqueue(node);
    notifier.signal();
}

/// Run the driver to completion, returning its report.
pub fn run(args: &DriverArgs) -> CliResult<DriverReport> {
    tracing::info!(
        client_count = args.client_count,
        loops = args.loops,
        msg_count = args.msg_count,
        peers = args.peers,
        "starting driver run"
    );

    if args.client_count == 0 {
        return Err(CliError::invalid_args("client_count must be nonzero"));
    }

    let shared_pool = Pool::new(args.msg_count as usize)?;

    let private_capacity = (args.peers.max(1)) as usize;
    let mut workers = Vec::with_capacity(args.client_count as usize);
    for _ in 0..args.client_count {
        workers.push(Worker::new(private_capacity, args.peers as usize)?);
    }
    let clients_created = workers.len() as u32;

    let queues: Vec<*mut MpscQueue> = workers.iter().map(|w| w.cmd_queue_ptr()).collect();
    let notifiers: Vec<Arc<Notifier>> = workers.iter().map(|w| w.notifier()).collect();
    let peers_as_struct: Vec<Peer> = workers.iter().map(|w| w.as_peer()).collect();

    if args.peers > 0 && clients_created > 1 {
        let mut rng = Xorshift(args.seed | 1);
        for i in 0..clients_created as usize {
            for _ in 0..args.peers {
                let offset = 1 + (rng.next() as usize % (clients_created as usize - 1));
                let target = (i + offset) % clients_created as usize;
                let peer = Peer::new(
                    peers_as_struct[target].cmd_queue(),
                    peers_as_struct[target].notifier(),
                );
                unsafe {
                    send(queues[i], &notifiers[i], verb::CONNECT, encode_peer(peer));
                }
            }
        }
    }

    let handles: Vec<_> = workers
        .into_iter()
        .map(|w| thread::spawn(move || w.run()))
        .collect();

    let mut report = DriverReport {
        clients_created,
        ..Default::default()
    };
    let expected = args.loops * clients_created as u64;

    for i in 0..args.loops {
        for c in 0..clients_created as usize {
            let node = if i & 1 == 0 {
                unsafe { shared_pool.acquire() }
            } else {
                unsafe { shared_pool.acquire_non_stalling() }
            };

            match node {
                Some(n) => {
                    unsafe {
                        (*n).arg1 = verb::DO_NOTHING;
                        (*queues[c]).enqueue(n);
                    }
                    notifiers[c].signal();
                    report.msgs_sent += 1;
                }
                None => {
                    report.no_msgs_count += 1;
                    thread::yield_now();
                }
            }
        }
    }

    for (i, (queue, notifier)) in queues.iter().zip(notifiers.iter()).enumerate() {
        tracing::debug!(client = i, "sending STOP");
        unsafe { send(*queue, notifier, verb::STOP, 0) };
    }

    let stats: Vec<WorkerStats> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for s in &stats {
        report.msgs_processed += s.processed;
        if s.error_count != 0 {
            report.clients_with_errors += 1;
        }
    }

    // The shared pool's nodes route straight back through each node's own
    // `pool` back-reference regardless of which client's queue they
    // travelled through, so by the time every worker has flushed and
    // shut down, every acquired node should be back.
    unsafe { shared_pool.deinit() };

    let sum = report.msgs_sent + report.no_msgs_count;
    if sum != expected {
        return Err(CliError::ClosureMismatch {
            msgs_sent: report.msgs_sent,
            no_msgs_count: report.no_msgs_count,
            expected,
        });
    }

    if report.clients_with_errors > 0 {
        return Err(CliError::WorkersReportedErrors {
            count: report.clients_with_errors,
        });
    }

    tracing::info!(
        msgs_sent = report.msgs_sent,
        no_msgs_count = report.no_msgs_count,
        msgs_processed = report.msgs_processed,
        "driver run complete"
    );

    Ok(report)
}
