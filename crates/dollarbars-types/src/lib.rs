//! Core types for the dollarbars trade downloader and bar generator.
//!
//! This crate provides the fundamental data structures used throughout dollarbars:
//!
//! - [`Trade`] - A normalized trade with running cumulative notional sums
//! - [`RawTrade`] - A trade as returned by an exchange, before normalization
//! - [`DollarBar`] - A bar sampled by cumulative notional volume
//! - [`ExchangeId`], [`Market`], [`BarSeries`] - Table identities
//! - [`DollarbarsError`] - The workspace error taxonomy

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bar;
mod error;
mod market;
mod trade;

pub use bar::{DollarBar, bucket_index};
pub use error::{DollarbarsError, Result};
pub use market::{BarSeries, ExchangeId, ExchangeIdParseError, Market};
pub use trade::{CumulativeSums, RawTrade, Side, SideParseError, Trade};

pub use rust_decimal::Decimal;
