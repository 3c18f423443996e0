//! # Vanity pool operator tool
//!
//! Maintenance surface for the vanity address pool. The bot process
//! consumes the pool as a library; this binary is what an operator runs
//! next to it.
//!
//! # CLI subcommands
//!
//! [`serve`] keeps the pool at its configured watermark until
//! interrupted, [`populate`] pre-fills it before first launch,
//! [`status`] prints pool statistics and [`claim`] consumes one address
//! for a manual check.
//!
//! [`serve`]: commands::serve
//! [`populate`]: commands::populate
//! [`status`]: commands::status
//! [`claim`]: commands::claim

mod cli;
mod commands;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command};
use common::{config::Config, logging};
use db::Database;
use pool::AddressPool;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = Config::new(cli.config)?;

    logging::init(&config);

    info!("connecting to database");
    let database = Database::connect(&config.database.url).await?;
    info!("database connection established");

    let address_pool = AddressPool::new(Arc::new(database), config.pool)?;

    match cli.command {
        Command::Serve => commands::serve(address_pool).await?,
        Command::Populate { count } => commands::populate(address_pool, count).await?,
        Command::Status => commands::status(address_pool).await?,
        Command::Claim => commands::claim(address_pool).await?,
    }

    Ok(())
}
