//! End-to-end checks for the multi-client driver, run in-process rather
//! than by spawning the `mq` binary.

use mq_cli::driver::{self, DriverArgs};

#[test]
fn small_run_closes_and_reports_no_errors() {
    let args = DriverArgs {
        client_count: 3,
        loops: 200,
        msg_count: 16,
        peers: 0,
        seed: 1,
    };
    let report = driver::run(&args).expect("driver run should succeed");
    assert_eq!(report.clients_created, 3);
    assert_eq!(report.clients_with_errors, 0);
    assert_eq!(
        report.msgs_sent + report.no_msgs_count,
        args.loops * args.client_count as u64
    );
}

#[test]
fn run_with_peer_fan_out_closes_and_reports_no_errors() {
    let args = DriverArgs {
        client_count: 4,
        loops: 100,
        msg_count: 8,
        peers: 2,
        seed: 42,
    };
    let report = driver::run(&args).expect("driver run should succeed");
    assert_eq!(report.clients_with_errors, 0);
    // Fan-out traffic between peers means more messages were processed
    // than the driver itself injected.
    assert!(report.msgs_processed >= report.msgs_sent);
}

#[test]
fn zero_clients_is_rejected() {
    let args = DriverArgs {
        client_count: 0,
        loops: 10,
        msg_count: 4,
        peers: 0,
        seed: 1,
    };
    assert!(driver::run(&args).is_err());
}
