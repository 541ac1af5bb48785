//! Trade source abstractions consumed by the ingestion controller.

use async_trait::async_trait;
use chrono::NaiveDate;
use dollarbars_types::{ExchangeId, RawTrade, Result};
use std::time::Duration;

/// A paginated trade API of one exchange.
///
/// Implementations perform exactly one request per call. Retrying, rate
/// limiting and pagination decisions belong to the caller.
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// Exchange served by this source.
    fn exchange(&self) -> ExchangeId;

    /// Minimum spacing between two requests advertised by the exchange.
    fn min_request_spacing(&self) -> Duration;

    /// Fetches one page of trades.
    ///
    /// `params` comes from the exchange's [`dollarbars_exchanges::FetchParams`]
    /// strategy.
    ///
    /// # Errors
    ///
    /// Returns [`dollarbars_types::DollarbarsError::Network`] for failures worth
    /// retrying and [`dollarbars_types::DollarbarsError::Protocol`] when the
    /// exchange rejects the request.
    async fn fetch_trades(&self, symbol: &str, params: &[(String, String)])
    -> Result<Vec<RawTrade>>;
}

/// Pre-published trade files, one per UTC day.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Exchange served by this source.
    fn exchange(&self) -> ExchangeId;

    /// Fetches and decodes all trades of one UTC day.
    ///
    /// Returns `Ok(None)` when no file exists for the day.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be downloaded or decoded.
    async fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<Option<Vec<RawTrade>>>;
}

/// Converts a unified symbol (`BTC/USDT`) to the concatenated exchange form (`BTCUSDT`).
#[must_use]
pub fn concat_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}
