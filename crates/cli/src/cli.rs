use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about, version)]
pub(crate) struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Keep the pool at its configured watermark until interrupted.
    Serve,

    /// Pre-populate the pool with a fixed number of addresses.
    Populate {
        /// How many addresses to generate.
        #[arg(long, default_value_t = 50)]
        count: u64,
    },

    /// Print pool statistics.
    Status,

    /// Claim one address from the pool and print it.
    Claim,
}
