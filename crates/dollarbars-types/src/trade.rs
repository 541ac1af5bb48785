//! Trade data representation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Taker bought.
    Buy,
    /// Taker sold.
    Sell,
}

impl Side {
    /// Returns the side as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = SideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" | "b" => Ok(Self::Buy),
            "sell" | "s" => Ok(Self::Sell),
            _ => Err(SideParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid side string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideParseError(String);

impl std::fmt::Display for SideParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid side '{}', expected buy or sell", self.0)
    }
}

impl std::error::Error for SideParseError {}

/// Trade as delivered by an exchange, before decimal conversion.
///
/// Prices and amounts stay in their textual wire form so that no binary
/// floating point value is ever involved in notional arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTrade {
    /// Execution time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Exchange-assigned trade identifier.
    pub id: String,
    /// Aggressor side.
    pub side: Side,
    /// Price as sent by the exchange.
    pub price: String,
    /// Base-asset amount as sent by the exchange.
    pub amount: String,
    /// Liquidation marker, `None` when the exchange does not report it.
    pub liquidation: Option<bool>,
    /// Native pagination cursor carried by this record, if any.
    pub cursor: Option<String>,
}

impl RawTrade {
    /// Creates a raw trade without liquidation marker or cursor.
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        id: impl Into<String>,
        side: Side,
        price: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            id: id.into(),
            side,
            price: price.into(),
            amount: amount.into(),
            liquidation: None,
            cursor: None,
        }
    }

    /// Sets the liquidation marker.
    #[must_use]
    pub const fn with_liquidation(mut self, liquidation: bool) -> Self {
        self.liquidation = Some(liquidation);
        self
    }

    /// Sets the native pagination cursor.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// The three running notional sums carried from trade to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CumulativeSums {
    /// Running sum of all notional.
    pub notional: Decimal,
    /// Running sum of buy-side notional.
    pub buy: Decimal,
    /// Running sum of sell-side notional.
    pub sell: Decimal,
}

impl CumulativeSums {
    /// All sums at zero.
    pub const ZERO: Self = Self {
        notional: Decimal::ZERO,
        buy: Decimal::ZERO,
        sell: Decimal::ZERO,
    };

    /// Creates cumulative sums from explicit values.
    #[must_use]
    pub const fn new(notional: Decimal, buy: Decimal, sell: Decimal) -> Self {
        Self {
            notional,
            buy,
            sell,
        }
    }

    /// Adds one trade's notional on the given side.
    pub fn add(&mut self, side: Side, notional: Decimal) {
        self.notional += notional;
        match side {
            Side::Buy => self.buy += notional,
            Side::Sell => self.sell += notional,
        }
    }

    /// Returns true when the per-side sums add up to the total.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.buy + self.sell == self.notional
    }
}

/// A normalized, persisted trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Execution time (UTC, microsecond precision).
    pub timestamp: DateTime<Utc>,
    /// Exchange-assigned trade identifier.
    pub id: String,
    /// Aggressor side.
    pub side: Side,
    /// Whether the trade was a forced liquidation.
    #[serde(default)]
    pub is_liquidation: bool,
    /// Execution price.
    pub price: Decimal,
    /// Base-asset amount.
    pub amount: Decimal,
    /// `price * amount`.
    pub notional: Decimal,
    /// Running sum of notional up to and including this trade.
    pub notional_cumsum: Decimal,
    /// Running sum of buy-side notional up to and including this trade.
    pub buy_notional_cumsum: Decimal,
    /// Running sum of sell-side notional up to and including this trade.
    pub sell_notional_cumsum: Decimal,
}

impl Trade {
    /// Returns the running sums recorded on this trade.
    #[must_use]
    pub const fn cumulative_sums(&self) -> CumulativeSums {
        CumulativeSums {
            notional: self.notional_cumsum,
            buy: self.buy_notional_cumsum,
            sell: self.sell_notional_cumsum,
        }
    }

    /// Returns the uniqueness key of the trade within its table.
    #[must_use]
    pub fn key(&self) -> (DateTime<Utc>, &str) {
        (self.timestamp, self.id.as_str())
    }

    /// Returns the notional cumulative sum just before this trade.
    #[must_use]
    pub fn notional_cumsum_before(&self) -> Decimal {
        self.notional_cumsum - self.notional
    }
}
