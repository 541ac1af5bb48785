//! Incremental construction of one dollar bar.

use chrono::{DateTime, Utc};
use dollarbars_types::{Decimal, DollarBar, Side, Trade};

/// Accumulates the trades of one bucket, in cumulative-sum order.
#[derive(Debug)]
pub(crate) struct BarBuilder {
    timestamp_from: DateTime<Utc>,
    trade_id_from: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    amount: Decimal,
    buy_notional: Decimal,
    sell_notional: Decimal,
    liquidation_buy_notional: Decimal,
    liquidation_sell_notional: Decimal,
    last: Trade,
}

impl BarBuilder {
    /// Creates a new builder from the first trade.
    pub(crate) fn new(trade: &Trade) -> Self {
        let mut builder = Self {
            timestamp_from: trade.timestamp,
            trade_id_from: trade.id.clone(),
            open: trade.price,
            high: trade.price,
            low: trade.price,
            amount: Decimal::ZERO,
            buy_notional: Decimal::ZERO,
            sell_notional: Decimal::ZERO,
            liquidation_buy_notional: Decimal::ZERO,
            liquidation_sell_notional: Decimal::ZERO,
            last: trade.clone(),
        };
        builder.add_volume(trade);
        builder
    }

    /// Updates the builder with the next trade of the bucket.
    pub(crate) fn update(&mut self, trade: &Trade) {
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.add_volume(trade);
        self.last = trade.clone();
    }

    fn add_volume(&mut self, trade: &Trade) {
        self.amount += trade.amount;
        match trade.side {
            Side::Buy => {
                self.buy_notional += trade.notional;
                if trade.is_liquidation {
                    self.liquidation_buy_notional += trade.notional;
                }
            }
            Side::Sell => {
                self.sell_notional += trade.notional;
                if trade.is_liquidation {
                    self.liquidation_sell_notional += trade.notional;
                }
            }
        }
    }

    /// Finishes building and returns the bar.
    pub(crate) fn finish(self) -> DollarBar {
        DollarBar {
            timestamp: self.last.timestamp,
            timestamp_from: self.timestamp_from,
            trade_id: self.last.id,
            trade_id_from: self.trade_id_from,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.last.price,
            amount: self.amount,
            notional_volume: self.buy_notional + self.sell_notional,
            buy_notional_volume: self.buy_notional,
            sell_notional_volume: self.sell_notional,
            liquidation_buy_notional_volume: self.liquidation_buy_notional,
            liquidation_sell_notional_volume: self.liquidation_sell_notional,
            notional_cumsum: self.last.notional_cumsum,
            buy_notional_cumsum: self.last.buy_notional_cumsum,
            sell_notional_cumsum: self.last.sell_notional_cumsum,
        }
    }
}
