//! Spawns the `mq` binary itself rather than calling `driver::run` in
//! process, the way the reference C harness is invoked from a shell.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::process::Command;

#[test]
fn run_with_small_counts_prints_closing_summary() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mq")?;
    cmd.args(["run", "1", "1", "1"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("msgs_sent=1"))
        .stdout(predicate::str::contains("no_msgs_count=0"));
    Ok(())
}

#[test]
fn run_closes_the_sent_plus_skipped_equation() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mq")?;
    cmd.args(["run", "4", "50", "8"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::is_match(r"msgs_sent=\d+ no_msgs_count=\d+").unwrap());
    Ok(())
}

#[test]
fn show_config_prints_resolved_defaults() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mq")?;
    cmd.arg("show-config");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("client_count"));
    Ok(())
}

#[test]
fn zero_client_count_exits_nonzero() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mq")?;
    cmd.args(["run", "0", "10", "4"]);
    cmd.assert().failure().code(1);
    Ok(())
}
