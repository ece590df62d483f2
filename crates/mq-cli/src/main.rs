//! `mq`: a command-line driver for the mq-queue/mq-pool/mq-worker stack.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mq_cli::Cli;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let cli = Cli::parse();

    if let Err(err) = cli.execute() {
        error!("run failed: {err}");
        std::process::exit(1);
    }
}
