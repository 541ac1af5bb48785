//! Exchange endpoint URLs.

use chrono::NaiveDate;

/// Binance aggregated trades endpoint.
pub const BINANCE_AGG_TRADES_URL: &str = "https://api.binance.com/api/v3/aggTrades";

/// Kraken public trades endpoint.
pub const KRAKEN_TRADES_URL: &str = "https://api.kraken.com/0/public/Trades";

/// Bitfinex v2 public API; trades live at `{BASE}/trades/{symbol}/hist`.
pub const BITFINEX_API_URL: &str = "https://api-pub.bitfinex.com/v2";

/// Poloniex public API; trades are `command=returnTradeHistory`.
pub const POLONIEX_PUBLIC_URL: &str = "https://poloniex.com/public";

/// Bequant v3 public API; trades live at `{BASE}/public/trades/{symbol}`.
pub const BEQUANT_API_URL: &str = "https://api.bequant.io/api/3";

/// Base URL of Bybit's published trade files.
pub const BYBIT_SNAPSHOT_BASE_URL: &str = "https://public.bybit.com/trading";

/// Builds the URL of one day's Bybit trade snapshot.
///
/// URL format: `{BASE_URL}/{SYMBOL}/{SYMBOL}{YYYY-MM-DD}.csv.gz`
///
/// # Example
///
/// ```
/// use dollarbars_fetch::url::snapshot_url;
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2020, 3, 26).unwrap();
/// assert_eq!(
///     snapshot_url("BTCUSD", day),
///     "https://public.bybit.com/trading/BTCUSD/BTCUSD2020-03-26.csv.gz"
/// );
/// ```
#[must_use]
pub fn snapshot_url(symbol: &str, day: NaiveDate) -> String {
    format!(
        "{}/{symbol}/{symbol}{}.csv.gz",
        BYBIT_SNAPSHOT_BASE_URL,
        day.format("%Y-%m-%d")
    )
}
