//! Bars command implementation.
//!
//! This module brings the trade table up to date and then generates dollar
//! bars from it.

use crate::commands::download::ingest;
use crate::display::AggregateProgressBar;
use anyhow::{Context, Result};
use dollarbars_lib::AggregateConfig;
use dollarbars_lib::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Generate dollar bars of `interval` notional for one market.
pub(crate) async fn bars(
    exchange: ExchangeId,
    symbol: &str,
    interval: Decimal,
    no_download: bool,
    data_dir: PathBuf,
    quiet: bool,
) -> Result<()> {
    debug!(data_dir = %data_dir.display(), %interval, "opening trade store");
    let store = SqliteStore::in_dir(&data_dir)
        .with_context(|| format!("Failed to open database in {}", data_dir.display()))?;

    if !no_download {
        ingest(exchange, symbol, None, &store, quiet).await?;
    }

    let series = BarSeries::new(Market::new(exchange, symbol), interval);
    let observer = AggregateProgressBar::new(quiet);
    let outcome = BarGenerator::new(&store, series.clone(), AggregateConfig::default())?
        .with_observer(&observer)
        .run()
        .with_context(|| format!("Aggregation into {} failed, rerun to resume", series.bar_table()))?;

    match outcome {
        AggregationOutcome::NoData => {
            if !quiet {
                println!("No {exchange} {symbol} trades stored, run `dollarbars download` first");
            }
        }
        AggregationOutcome::Drained { bars, trades_read } => {
            observer.finish(format!("{bars} bars from {trades_read} trades"));
            if !quiet {
                println!("Appended {bars} bars to {}", series.bar_table());
            }
        }
    }
    Ok(())
}
