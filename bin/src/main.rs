//! dollarbars CLI - crypto trade downloader and dollar bar generator.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use dollarbars_lib::prelude::*;
use std::path::PathBuf;

mod commands;
mod display;
mod logging;

#[derive(Parser)]
#[command(name = "dollarbars")]
#[command(about = "Crypto trade downloader and dollar bar generator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory holding the trade and bar tables
    #[arg(long, env = "DOLLARBARS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported exchanges and their download profiles
    Exchanges,

    /// Download trades into the store, resuming after the latest stored trade
    Download {
        /// Exchange identifier (e.g., binance, kraken, bybit)
        exchange: ExchangeId,

        /// Unified market symbol (e.g., BTC/USDT)
        symbol: String,

        /// Start date (YYYY-MM-DD) for an empty table. Ignored when resuming.
        #[arg(short, long)]
        since: Option<String>,
    },

    /// Generate dollar bars from stored trades
    Bars {
        /// Exchange identifier (e.g., binance, kraken, bybit)
        exchange: ExchangeId,

        /// Unified market symbol (e.g., BTC/USDT)
        symbol: String,

        /// Notional volume per bar (e.g., 1000000)
        interval: Decimal,

        /// Aggregate the stored trades without downloading new ones first
        #[arg(long)]
        no_download: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let data_dir = cli.data_dir.unwrap_or_else(SqliteStore::default_dir);

    match command {
        Commands::Exchanges => commands::exchanges::list_exchanges(),
        Commands::Download {
            exchange,
            symbol,
            since,
        } => {
            commands::download::download(exchange, &symbol, since.as_deref(), data_dir, cli.quiet)
                .await
        }
        Commands::Bars {
            exchange,
            symbol,
            interval,
            no_download,
        } => {
            commands::bars::bars(exchange, &symbol, interval, no_download, data_dir, cli.quiet)
                .await
        }
    }
}
