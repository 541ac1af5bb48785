//! Per-exchange query parameter strategies.

use chrono::{DateTime, Utc};
use dollarbars_types::ExchangeId;

/// Query parameters sent with a trade request, in insertion order.
pub type QueryParams = Vec<(String, String)>;

/// Position of the next trade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchWindow {
    /// Half-open time range in nanoseconds since the Unix epoch.
    Range {
        /// Window start.
        start_ns: i64,
        /// Window end.
        end_ns: i64,
    },
    /// Native exchange cursor.
    Cursor {
        /// Opaque cursor value understood by the exchange.
        since: String,
    },
}

/// Builds the exchange-specific query parameters for one trade request.
pub trait FetchParams: Send + Sync + std::fmt::Debug {
    /// Returns the query parameters for `window`, with `limit` trades per page.
    fn build(&self, window: &FetchWindow, limit: u32) -> QueryParams;
}

/// Returns the parameter strategy for an exchange.
#[must_use]
pub fn params_for(exchange: ExchangeId) -> &'static dyn FetchParams {
    match exchange {
        ExchangeId::Bequant => &BequantParams,
        ExchangeId::Binance => &BinanceParams,
        ExchangeId::Bitfinex2 => &BitfinexParams,
        ExchangeId::Kraken => &KrakenParams,
        ExchangeId::Poloniex => &PoloniexParams,
        ExchangeId::Bybit => &NoParams,
    }
}

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

fn pair(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Binance: millisecond `startTime`/`endTime` and `limit`.
#[derive(Debug, Clone, Copy)]
struct BinanceParams;

impl FetchParams for BinanceParams {
    fn build(&self, window: &FetchWindow, limit: u32) -> QueryParams {
        match window {
            FetchWindow::Range { start_ns, end_ns } => vec![
                pair("startTime", start_ns / NANOS_PER_MILLI),
                pair("endTime", end_ns / NANOS_PER_MILLI),
                pair("limit", limit),
            ],
            FetchWindow::Cursor { since } => vec![pair("fromId", since), pair("limit", limit)],
        }
    }
}

/// Bitfinex: millisecond `start`/`end`, `limit`, ascending sort.
#[derive(Debug, Clone, Copy)]
struct BitfinexParams;

impl FetchParams for BitfinexParams {
    fn build(&self, window: &FetchWindow, limit: u32) -> QueryParams {
        match window {
            FetchWindow::Range { start_ns, end_ns } => vec![
                pair("start", start_ns / NANOS_PER_MILLI),
                pair("end", end_ns / NANOS_PER_MILLI),
                pair("limit", limit),
                pair("sort", 1),
            ],
            FetchWindow::Cursor { .. } => Vec::new(),
        }
    }
}

/// Kraken: a single nanosecond `since` cursor.
#[derive(Debug, Clone, Copy)]
struct KrakenParams;

impl FetchParams for KrakenParams {
    fn build(&self, window: &FetchWindow, _limit: u32) -> QueryParams {
        match window {
            FetchWindow::Range { start_ns, .. } => vec![pair("since", start_ns)],
            FetchWindow::Cursor { since } => vec![pair("since", since)],
        }
    }
}

/// Poloniex: second `start`/`end` and `limit`.
#[derive(Debug, Clone, Copy)]
struct PoloniexParams;

impl FetchParams for PoloniexParams {
    fn build(&self, window: &FetchWindow, limit: u32) -> QueryParams {
        match window {
            FetchWindow::Range { start_ns, end_ns } => vec![
                pair("start", start_ns / NANOS_PER_SECOND),
                pair("end", end_ns / NANOS_PER_SECOND),
                pair("limit", limit),
            ],
            FetchWindow::Cursor { .. } => Vec::new(),
        }
    }
}

/// Bequant: formatted `from`/`till` timestamps, `limit`, ascending sort.
#[derive(Debug, Clone, Copy)]
struct BequantParams;

impl BequantParams {
    fn format(ns: i64) -> String {
        DateTime::<Utc>::from_timestamp_nanos(ns)
            .format("%Y-%m-%d %H:%M:%S%.6f%z")
            .to_string()
    }
}

impl FetchParams for BequantParams {
    fn build(&self, window: &FetchWindow, limit: u32) -> QueryParams {
        match window {
            FetchWindow::Range { start_ns, end_ns } => vec![
                pair("from", Self::format(*start_ns)),
                pair("till", Self::format(*end_ns)),
                pair("limit", limit),
                pair("sort", "ASC"),
            ],
            FetchWindow::Cursor { .. } => Vec::new(),
        }
    }
}

/// Exchanges without a paginated trade API.
#[derive(Debug, Clone, Copy)]
struct NoParams;

impl FetchParams for NoParams {
    fn build(&self, _window: &FetchWindow, _limit: u32) -> QueryParams {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: i64 = 1_609_459_200_000_000_000; // 2021-01-01T00:00:00Z
    const END: i64 = START + 1_800_000_000_000;

    fn range() -> FetchWindow {
        FetchWindow::Range {
            start_ns: START,
            end_ns: END,
        }
    }

    fn get<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_binance_params() {
        let params = params_for(ExchangeId::Binance).build(&range(), 1000);
        assert_eq!(get(&params, "startTime"), Some("1609459200000"));
        assert_eq!(get(&params, "endTime"), Some("1609461000000"));
        assert_eq!(get(&params, "limit"), Some("1000"));
    }

    #[test]
    fn test_bitfinex_params() {
        let params = params_for(ExchangeId::Bitfinex2).build(&range(), 1000);
        assert_eq!(get(&params, "start"), Some("1609459200000"));
        assert_eq!(get(&params, "sort"), Some("1"));
    }

    #[test]
    fn test_poloniex_uses_seconds() {
        let polo = params_for(ExchangeId::Poloniex).build(&range(), 1000);
        assert_eq!(get(&polo, "start"), Some("1609459200"));
        assert_eq!(get(&polo, "end"), Some("1609461000"));
        assert_eq!(get(&polo, "limit"), Some("1000"));
    }

    #[test]
    fn test_kraken_cursor() {
        let kraken = params_for(ExchangeId::Kraken);
        let initial = kraken.build(&range(), 1000);
        assert_eq!(get(&initial, "since"), Some("1609459200000000000"));

        let next = kraken.build(
            &FetchWindow::Cursor {
                since: "1609459300123456789".into(),
            },
            1000,
        );
        assert_eq!(get(&next, "since"), Some("1609459300123456789"));
    }

    #[test]
    fn test_bequant_formatting() {
        let params = params_for(ExchangeId::Bequant).build(&range(), 1000);
        assert_eq!(get(&params, "from"), Some("2021-01-01 00:00:00.000000+0000"));
        assert_eq!(get(&params, "till"), Some("2021-01-01 00:30:00.000000+0000"));
        assert_eq!(get(&params, "sort"), Some("ASC"));
    }

    #[test]
    fn test_bybit_has_no_params() {
        assert!(params_for(ExchangeId::Bybit).build(&range(), 0).is_empty());
    }
}
