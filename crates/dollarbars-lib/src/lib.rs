//! Crypto trade downloader and dollar bar generator.
//!
//! This is a facade crate that re-exports functionality from the dollarbars
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use dollarbars_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ExchangeRegistry::builtin();
//!     let store = SqliteStore::with_default_path()?;
//!     let source = BinanceSource::new(DownloadClient::with_defaults()?);
//!
//!     run_ingestion(&registry, &store, Feed::Paged(&source), "BTC/USDT", None).await?;
//!
//!     let market = Market::new(ExchangeId::Binance, "BTC/USDT");
//!     run_aggregation(&store, &market, Decimal::from(1_000_000))?;
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dollarbars/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use dollarbars_types::*;

// Re-export the exchange registry
pub use dollarbars_exchanges::{
    ExchangeProfile, ExchangeRegistry, FetchMode, FetchParams, FetchWindow, params_for,
};

// Re-export stores
pub use dollarbars_store::{MemoryStore, SqliteStore, StoreError, TradeStore};

// Re-export download functionality
#[cfg(feature = "download")]
pub use dollarbars_fetch::{
    BequantSource, BinanceSource, BitfinexSource, BybitSnapshotSource, ClientConfig,
    DecompressError, DownloadClient, DownloadError, KrakenSource, ParseError, PoloniexSource,
    SnapshotSource, TradeSource,
};

#[cfg(feature = "download")]
pub use dollarbars_ingest::{
    AdaptiveWindow, BatchNormalizer, Feed, IngestConfig, IngestController, IngestObserver,
    IngestProgress, IngestSummary, SortOrder, run_ingestion,
};

// Re-export aggregation
#[cfg(feature = "aggregate")]
pub use dollarbars_aggregate::{
    AggregateConfig, AggregateObserver, AggregationOutcome, BarGenerator, DollarBarAggregator,
    run_aggregation,
};

/// Prelude module for convenient imports.
///
/// ```
/// use dollarbars_lib::prelude::*;
/// ```
pub mod prelude {
    pub use dollarbars_types::{
        BarSeries, Decimal, DollarBar, DollarbarsError, ExchangeId, Market, Result, Side, Trade,
    };

    pub use dollarbars_exchanges::ExchangeRegistry;

    pub use dollarbars_store::{MemoryStore, SqliteStore, TradeStore};

    #[cfg(feature = "download")]
    pub use dollarbars_fetch::{
        BequantSource, BinanceSource, BitfinexSource, BybitSnapshotSource, DownloadClient,
        KrakenSource, PoloniexSource,
    };

    #[cfg(feature = "download")]
    pub use dollarbars_ingest::{Feed, IngestController, run_ingestion};

    #[cfg(feature = "aggregate")]
    pub use dollarbars_aggregate::{AggregationOutcome, BarGenerator, run_aggregation};
}
