//! Argument parsing and subcommand dispatch for `mq`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CliConfig;
use crate::driver::{self, DriverArgs};
use crate::error::CliResult;

/// Command-line test driver for the mq-queue/mq-pool/mq-worker stack.
#[derive(Parser, Debug)]
#[command(name = "mq", version, about)]
pub struct Cli {
    /// Path to a config file overriding the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the multi-client message-passing driver.
    Run {
        /// Number of worker clients to create.
        client_count: Option<u32>,
        /// Number of rounds to feed every client a message.
        loops: Option<u64>,
        /// Size of the shared pool (and each client's private pool).
        msg_count: Option<u32>,
        /// Number of peer connections per client.
        #[arg(long, default_value_t = 0)]
        peers: u32,
        /// Seed for the deterministic peer-connection order.
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Print the resolved configuration that `run` would use.
    ShowConfig,
}

impl Cli {
    /// Execute the parsed command.
    pub fn execute(self) -> CliResult<()> {
        let config_path = match self.config {
            Some(p) => p,
            None => CliConfig::default_config_path()?,
        };
        let config = CliConfig::load_from_file(&config_path)?;

        match self.command {
            Command::Run {
                client_count,
                loops,
                msg_count,
                peers,
                seed,
            } => {
                let args = DriverArgs {
                    client_count: client_count.or(config.client_count).unwrap_or(4),
                    loops: loops.or(config.loops).unwrap_or(1000),
                    msg_count: msg_count.or(config.msg_count).unwrap_or(64),
                    peers,
                    seed,
                };
                let report = driver::run(&args)?;
                println!(
                    "clients_created={} msgs_sent={} no_msgs_count={} msgs_processed={}",
                    report.clients_created,
                    report.msgs_sent,
                    report.no_msgs_count,
                    report.msgs_processed
                );
                Ok(())
            }
            Command::ShowConfig => {
                println!("{config:#?}");
                Ok(())
            }
        }
    }
}
