//! Conversion of raw exchange trades into persisted trades.

use chrono::{DateTime, SubsecRound, Utc};
use dollarbars_types::{CumulativeSums, DollarbarsError, RawTrade, Result, Trade};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Order applied to a batch before running sums are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending native trade id, numerically when ids are integers.
    NativeId,
    /// Ascending timestamp, file order among equal timestamps.
    Timestamp,
}

impl SortOrder {
    fn compare(self, a: &RawTrade, b: &RawTrade) -> Ordering {
        match self {
            Self::NativeId => compare_ids(&a.id, &b.id).then(a.timestamp.cmp(&b.timestamp)),
            Self::Timestamp => a.timestamp.cmp(&b.timestamp),
        }
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u128>(), b.parse::<u128>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn parse_decimal(text: &str, field: &str, id: &str) -> Result<Decimal> {
    let text = text.trim();
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| DollarbarsError::Parse(format!("invalid {field} '{text}' in trade {id}")))
}

type TradeKey = (DateTime<Utc>, String);

/// Turns raw pages into trades carrying exact running sums.
///
/// The normalizer owns the running sums between batches. [`Self::normalize`]
/// is pure; the sums only move once [`Self::commit`] is called after the
/// batch was stored.
#[derive(Debug, Clone)]
pub struct BatchNormalizer {
    order: SortOrder,
    sums: CumulativeSums,
    boundary: HashSet<TradeKey>,
}

impl BatchNormalizer {
    /// Starts from zero sums.
    #[must_use]
    pub fn new(order: SortOrder) -> Self {
        Self {
            order,
            sums: CumulativeSums::ZERO,
            boundary: HashSet::new(),
        }
    }

    /// Continues after a stored trade.
    #[must_use]
    pub fn resume_from(order: SortOrder, latest: &Trade) -> Self {
        let (timestamp, id) = latest.key();
        Self {
            order,
            sums: latest.cumulative_sums(),
            boundary: HashSet::from([(timestamp, id.to_string())]),
        }
    }

    /// Returns the sums carried into the next batch.
    #[must_use]
    pub const fn sums(&self) -> CumulativeSums {
        self.sums
    }

    /// Sorts, deduplicates and prices a raw page.
    ///
    /// Trades already stored by the previous batch, and repeats within the
    /// page, are dropped before summing.
    ///
    /// # Errors
    ///
    /// Returns [`DollarbarsError::Parse`] if a price or amount is not a decimal
    /// or the notional overflows.
    pub fn normalize(&self, mut raw: Vec<RawTrade>) -> Result<Vec<Trade>> {
        let order = self.order;
        raw.sort_by(|a, b| order.compare(a, b));

        let mut seen: HashSet<TradeKey> = HashSet::with_capacity(raw.len());
        let mut sums = self.sums;
        let mut trades = Vec::with_capacity(raw.len());

        for item in raw {
            let timestamp = item.timestamp.trunc_subsecs(6);
            let key = (timestamp, item.id);
            if self.boundary.contains(&key) || !seen.insert(key.clone()) {
                continue;
            }
            let (timestamp, id) = key;

            let price = parse_decimal(&item.price, "price", &id)?;
            let amount = parse_decimal(&item.amount, "amount", &id)?;
            let notional = price
                .checked_mul(amount)
                .ok_or_else(|| DollarbarsError::Parse(format!("notional overflow in trade {id}")))?;
            sums.add(item.side, notional);

            trades.push(Trade {
                timestamp,
                id,
                side: item.side,
                is_liquidation: item.liquidation.unwrap_or(false),
                price,
                amount,
                notional,
                notional_cumsum: sums.notional,
                buy_notional_cumsum: sums.buy,
                sell_notional_cumsum: sums.sell,
            });
        }
        Ok(trades)
    }

    /// Records a stored batch: its final sums and keys become the new boundary.
    pub fn commit(&mut self, batch: &[Trade]) {
        if let Some(last) = batch.last() {
            self.sums = last.cumulative_sums();
            self.boundary = batch.iter().map(|t| (t.timestamp, t.id.clone())).collect();
        }
    }
}
