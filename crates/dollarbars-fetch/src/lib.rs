//! HTTP client and exchange trade sources for dollarbars.
//!
//! - [`DownloadClient`] - HTTP client with connection pooling and retries
//! - [`TradeSource`] - one page of trades from a paginated exchange API
//! - [`SnapshotSource`] - one day of trades from published files
//! - [`BinanceSource`], [`BitfinexSource`], [`PoloniexSource`], [`BequantSource`] - windowed sources
//! - [`KrakenSource`] - cursor source
//! - [`BybitSnapshotSource`] - daily snapshot source

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bequant;
mod binance;
mod bitfinex;
mod client;
mod decompress;
mod kraken;
mod parse;
mod poloniex;
mod snapshot;
mod source;
pub mod url;

pub use bequant::{BequantSource, parse_trades as parse_bequant_trades};
pub use binance::{BinanceSource, parse_agg_trades};
pub use bitfinex::{BitfinexSource, bitfinex_symbol, parse_trades as parse_bitfinex_trades};
pub use client::{ClientConfig, DownloadClient, DownloadError};
pub use decompress::{DecompressError, decompress_gzip};
pub use kraken::{KrakenSource, kraken_pair, parse_trades as parse_kraken_trades};
pub use parse::{
    ParseError, SnapshotRow, parse_snapshot, timestamp_from_millis, timestamp_from_rfc3339,
    timestamp_from_seconds,
};
pub use poloniex::{PoloniexSource, parse_trade_history, poloniex_pair};
pub use snapshot::{BybitSnapshotSource, decode_snapshot};
pub use source::{SnapshotSource, TradeSource, concat_symbol};
