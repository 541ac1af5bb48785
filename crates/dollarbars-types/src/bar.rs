//! Dollar bar data structure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CumulativeSums;

/// Returns the bucket a cumulative notional value falls into.
///
/// Computed as `(cumsum - cumsum % interval) / interval` so the quotient is
/// always an exact integer, whatever the scale of the operands.
///
/// # Panics
///
/// Panics if `interval` is zero.
#[must_use]
pub fn bucket_index(cumsum: Decimal, interval: Decimal) -> Decimal {
    let rem = cumsum % interval;
    let floored = if rem.is_sign_negative() && !rem.is_zero() {
        cumsum - rem - interval
    } else {
        cumsum - rem
    };
    (floored / interval).normalize()
}

/// A bar covering one bucket of cumulative notional volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DollarBar {
    /// Timestamp of the last trade in the bar.
    pub timestamp: DateTime<Utc>,
    /// Timestamp of the first trade in the bar.
    pub timestamp_from: DateTime<Utc>,
    /// Identifier of the last trade in the bar.
    pub trade_id: String,
    /// Identifier of the first trade in the bar.
    pub trade_id_from: String,
    /// First trade price.
    pub open: Decimal,
    /// Highest trade price.
    pub high: Decimal,
    /// Lowest trade price.
    pub low: Decimal,
    /// Last trade price.
    pub close: Decimal,
    /// Total base-asset amount.
    pub amount: Decimal,
    /// Total notional.
    pub notional_volume: Decimal,
    /// Buy-side notional.
    pub buy_notional_volume: Decimal,
    /// Sell-side notional.
    pub sell_notional_volume: Decimal,
    /// Buy-side notional from liquidations.
    pub liquidation_buy_notional_volume: Decimal,
    /// Sell-side notional from liquidations.
    pub liquidation_sell_notional_volume: Decimal,
    /// Notional cumulative sum of the last trade.
    pub notional_cumsum: Decimal,
    /// Buy-side cumulative sum of the last trade.
    pub buy_notional_cumsum: Decimal,
    /// Sell-side cumulative sum of the last trade.
    pub sell_notional_cumsum: Decimal,
}

impl DollarBar {
    /// Returns the closing running sums carried from the bar's last trade.
    #[must_use]
    pub const fn cumulative_sums(&self) -> CumulativeSums {
        CumulativeSums {
            notional: self.notional_cumsum,
            buy: self.buy_notional_cumsum,
            sell: self.sell_notional_cumsum,
        }
    }

    /// Returns the bucket this bar closes, for the given interval.
    #[must_use]
    pub fn bucket(&self, interval: Decimal) -> Decimal {
        bucket_index(self.notional_cumsum, interval)
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Returns the share of notional that was bought by takers.
    #[must_use]
    pub fn buy_ratio(&self) -> Option<Decimal> {
        if self.notional_volume.is_zero() {
            return None;
        }
        Some(self.buy_notional_volume / self.notional_volume)
    }
}
