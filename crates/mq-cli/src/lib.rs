//! `mq` CLI crate.
//!
//! Purpose:
//! - Drive the `mq-queue`/`mq-pool`/`mq-worker` stack from the command
//!   line: spin up N worker "clients", feed them messages from a shared
//!   pool for a number of rounds, stop them, and check that the driver's
//!   own sent/skipped bookkeeping closes.
//!
//! Public responsibilities (library view):
//! - Re-export the CLI entry point ([`Cli`]) and the [`driver`] module so
//!   both can be exercised directly from integration tests, without
//!   spawning the `mq` binary as a subprocess.

pub mod config;
pub mod driver;
pub mod error;

mod cli;

pub use cli::Cli;
pub use error::CliResult;
