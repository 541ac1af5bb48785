//! The store interface used by ingestion and aggregation.

use dollarbars_types::{BarSeries, Decimal, DollarBar, Market, Trade};

use crate::Result;

/// Persistence for trades and dollar bars.
///
/// Trade tables are append-only and kept in ascending cumulative-sum order;
/// the ingestion controller is their only writer. Bar tables are written only
/// by the aggregator. Reads of a table that was never created behave as if
/// the table were empty.
pub trait TradeStore: Send + Sync {
    /// Creates the trade table for `market` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    fn ensure_trade_table(&self, market: &Market) -> Result<()>;

    /// Creates the bar table for `series` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    fn ensure_bar_table(&self, series: &BarSeries) -> Result<()>;

    /// Returns the most recently appended trade.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn get_latest_trade(&self, market: &Market) -> Result<Option<Trade>>;

    /// Returns the first trade ever appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn get_first_trade(&self, market: &Market) -> Result<Option<Trade>>;

    /// Returns the most recently appended bar.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn get_latest_bar(&self, series: &BarSeries) -> Result<Option<DollarBar>>;

    /// Appends a batch of trades atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is missing, a key is duplicated, or the
    /// write fails. Nothing is stored in that case.
    fn append_trades(&self, market: &Market, trades: &[Trade]) -> Result<()>;

    /// Appends a batch of bars atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is missing, a key is duplicated, or the
    /// write fails. Nothing is stored in that case.
    fn append_bars(&self, series: &BarSeries, bars: &[DollarBar]) -> Result<()>;

    /// Returns up to `limit` trades with `notional_cumsum > after`, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn query_trades_page(&self, market: &Market, after: Decimal, limit: usize)
    -> Result<Vec<Trade>>;
}
