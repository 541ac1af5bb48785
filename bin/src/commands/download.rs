//! Download command implementation.
//!
//! This module wires an exchange source to the ingestion controller and
//! appends the downloaded trades to the data directory.

use crate::display::IngestProgressBar;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dollarbars_lib::IngestSummary;
use dollarbars_lib::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Returns the endpoint trades of `exchange` are downloaded from.
pub(crate) const fn source_endpoint(exchange: ExchangeId) -> &'static str {
    match exchange {
        ExchangeId::Bequant => "public/trades",
        ExchangeId::Binance => "aggTrades",
        ExchangeId::Bitfinex2 => "trades/hist",
        ExchangeId::Kraken => "Trades",
        ExchangeId::Poloniex => "returnTradeHistory",
        ExchangeId::Bybit => "daily csv.gz",
    }
}

/// Parses a `YYYY-MM-DD` start date as midnight UTC.
pub(crate) fn parse_since(text: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("Invalid start date: {text}"))?;
    Ok(day.and_time(NaiveTime::MIN).and_utc())
}

/// Download trades of one market into the store.
pub(crate) async fn download(
    exchange: ExchangeId,
    symbol: &str,
    since: Option<&str>,
    data_dir: PathBuf,
    quiet: bool,
) -> Result<()> {
    let since = since.map(parse_since).transpose()?;
    debug!(data_dir = %data_dir.display(), "opening trade store");
    let store = SqliteStore::in_dir(&data_dir)
        .with_context(|| format!("Failed to open database in {}", data_dir.display()))?;

    let summary = ingest(exchange, symbol, since, &store, quiet).await?;

    if !quiet {
        println!(
            "Stored {} new {} {} trades in {}",
            summary.trades,
            exchange,
            symbol,
            data_dir.display()
        );
        if let Some(sums) = summary.final_sums {
            println!("Cumulative notional: {}", sums.notional);
        }
    }
    Ok(())
}

/// Runs one ingestion of `symbol` on `exchange` into `store`.
pub(crate) async fn ingest(
    exchange: ExchangeId,
    symbol: &str,
    since: Option<DateTime<Utc>>,
    store: &dyn TradeStore,
    quiet: bool,
) -> Result<IngestSummary> {
    let registry = ExchangeRegistry::builtin();
    registry.require(exchange)?;

    let client = DownloadClient::with_defaults().context("Failed to create HTTP client")?;
    let observer = IngestProgressBar::new(quiet);
    let controller = IngestController::new(&registry, store).with_observer(&observer);

    let summary = match exchange {
        ExchangeId::Bequant => {
            let source = BequantSource::new(client);
            controller.run(Feed::Paged(&source), symbol, since).await
        }
        ExchangeId::Binance => {
            let source = BinanceSource::new(client);
            controller.run(Feed::Paged(&source), symbol, since).await
        }
        ExchangeId::Bitfinex2 => {
            let source = BitfinexSource::new(client);
            controller.run(Feed::Paged(&source), symbol, since).await
        }
        ExchangeId::Kraken => {
            let source = KrakenSource::new(client);
            controller.run(Feed::Paged(&source), symbol, since).await
        }
        ExchangeId::Poloniex => {
            let source = PoloniexSource::new(client);
            controller.run(Feed::Paged(&source), symbol, since).await
        }
        ExchangeId::Bybit => {
            let source = BybitSnapshotSource::new(client);
            controller.run(Feed::Snapshots(&source), symbol, since).await
        }
    };
    summary.with_context(|| format!("Download of {exchange} {symbol} failed, rerun to resume"))
}
