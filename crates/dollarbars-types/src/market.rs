//! Exchange identifiers and logical table identities.

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    /// Bequant.
    Bequant,
    /// Binance spot.
    Binance,
    /// Bitfinex (v2 API).
    Bitfinex2,
    /// Kraken spot.
    Kraken,
    /// Poloniex.
    Poloniex,
    /// Bybit (daily public trade snapshots).
    Bybit,
}

impl ExchangeId {
    /// Returns the exchange identifier as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bequant => "bequant",
            Self::Binance => "binance",
            Self::Bitfinex2 => "bitfinex2",
            Self::Kraken => "kraken",
            Self::Poloniex => "poloniex",
            Self::Bybit => "bybit",
        }
    }

    /// Returns all known exchanges.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Bequant,
            Self::Binance,
            Self::Bitfinex2,
            Self::Kraken,
            Self::Poloniex,
            Self::Bybit,
        ]
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ExchangeIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bequant" => Ok(Self::Bequant),
            "binance" => Ok(Self::Binance),
            "bitfinex" | "bitfinex2" => Ok(Self::Bitfinex2),
            "kraken" => Ok(Self::Kraken),
            "poloniex" => Ok(Self::Poloniex),
            "bybit" => Ok(Self::Bybit),
            _ => Err(ExchangeIdParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown exchange name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeIdParseError(String);

impl std::fmt::Display for ExchangeIdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown exchange '{}', expected one of: bequant, binance, bitfinex2, kraken, poloniex, bybit",
            self.0
        )
    }
}

impl std::error::Error for ExchangeIdParseError {}

/// One exchange/symbol pair, i.e. one trade table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{exchange}:{symbol}")]
pub struct Market {
    /// Exchange the trades come from.
    pub exchange: ExchangeId,
    /// Unified symbol, e.g. `BTC/USDT`.
    pub symbol: String,
}

impl Market {
    /// Creates a market.
    #[must_use]
    pub fn new(exchange: ExchangeId, symbol: impl Into<String>) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
        }
    }

    /// Returns the trade table name, e.g. `binance_btc_usdt_trade`.
    #[must_use]
    pub fn trade_table(&self) -> String {
        format!("{}_{}_trade", self.exchange, sanitize(&self.symbol))
    }
}

/// One bar series: a market sampled at a fixed notional interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{market}@{interval}")]
pub struct BarSeries {
    /// Source market.
    pub market: Market,
    /// Notional per bar.
    pub interval: Decimal,
}

impl BarSeries {
    /// Creates a bar series.
    #[must_use]
    pub const fn new(market: Market, interval: Decimal) -> Self {
        Self { market, interval }
    }

    /// Returns the bar table name, e.g. `binance_btc_usdt_10000000_dollarbar`.
    #[must_use]
    pub fn bar_table(&self) -> String {
        format!(
            "{}_{}_{}_dollarbar",
            self.market.exchange,
            sanitize(&self.market.symbol),
            sanitize(&self.interval.normalize().to_string())
        )
    }
}

/// Lower-cases and replaces characters that are unsafe in table and file names.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_parse() {
        assert_eq!("Binance".parse::<ExchangeId>().unwrap(), ExchangeId::Binance);
        assert_eq!("bitfinex".parse::<ExchangeId>().unwrap(), ExchangeId::Bitfinex2);
        assert!("mtgox".parse::<ExchangeId>().is_err());
    }

    #[test]
    fn test_exchange_round_trip_all() {
        for id in ExchangeId::all() {
            assert_eq!(id.as_str().parse::<ExchangeId>().unwrap(), *id);
        }
    }

    #[test]
    fn test_table_names() {
        let market = Market::new(ExchangeId::Binance, "BTC/USDT");
        assert_eq!(market.trade_table(), "binance_btc_usdt_trade");
        assert_eq!(market.to_string(), "binance:BTC/USDT");

        let series = BarSeries::new(market, "10000000.00".parse().unwrap());
        assert_eq!(series.bar_table(), "binance_btc_usdt_10000000_dollarbar");
    }

    #[test]
    fn test_fractional_interval_table_name() {
        let series = BarSeries::new(
            Market::new(ExchangeId::Kraken, "ETH/EUR"),
            "2.5".parse().unwrap(),
        );
        assert_eq!(series.bar_table(), "kraken_eth_eur_2_5_dollarbar");
    }
}
