//! Streaming trade-to-dollar-bar aggregation.

use dollarbars_types::{Decimal, DollarBar, DollarbarsError, Result, Trade, bucket_index};

use crate::builder::BarBuilder;

/// Streaming dollar bar aggregator.
///
/// Buffers trades in cumulative-sum order and turns every bucket that is
/// provably closed into a bar. The trades of the last bucket stay buffered
/// until a trade of a higher bucket arrives.
#[derive(Debug)]
pub struct DollarBarAggregator {
    interval: Decimal,
    buffer: Vec<Trade>,
}

impl DollarBarAggregator {
    /// Creates an aggregator for bars of `interval` notional.
    ///
    /// # Errors
    ///
    /// Returns [`DollarbarsError::InvalidInterval`] unless `interval > 0`.
    pub fn new(interval: Decimal) -> Result<Self> {
        if interval <= Decimal::ZERO {
            return Err(DollarbarsError::InvalidInterval(interval));
        }
        Ok(Self {
            interval,
            buffer: Vec::new(),
        })
    }

    /// Returns the notional interval.
    #[must_use]
    pub const fn interval(&self) -> Decimal {
        self.interval
    }

    /// Returns the buffered trades of buckets that are still open.
    #[must_use]
    pub fn pending(&self) -> &[Trade] {
        &self.buffer
    }

    /// Returns the cumulative sum of the last buffered trade.
    #[must_use]
    pub fn cursor(&self) -> Option<Decimal> {
        self.buffer.last().map(|t| t.notional_cumsum)
    }

    /// Returns the bucket of a trade.
    #[must_use]
    pub fn bucket_of(&self, trade: &Trade) -> Decimal {
        bucket_index(trade.notional_cumsum, self.interval)
    }

    /// Adds a page of trades and returns the bars it closed, oldest first.
    ///
    /// Nothing is returned while the first and last buffered trade share a
    /// bucket. Otherwise every trade whose bucket is below the last trade's
    /// bucket is aggregated and removed from the buffer.
    pub fn push_page(&mut self, page: Vec<Trade>) -> Vec<DollarBar> {
        self.buffer.extend(page);
        self.buffer
            .sort_by(|a, b| a.notional_cumsum.cmp(&b.notional_cumsum));

        let (Some(first), Some(last)) = (self.buffer.first(), self.buffer.last()) else {
            return Vec::new();
        };
        let last_bucket = self.bucket_of(last);
        if self.bucket_of(first) == last_bucket {
            return Vec::new();
        }

        let open_from = self
            .buffer
            .partition_point(|t| bucket_index(t.notional_cumsum, self.interval) < last_bucket);
        let closed: Vec<Trade> = self.buffer.drain(..open_from).collect();
        self.build_bars(&closed)
    }

    fn build_bars(&self, closed: &[Trade]) -> Vec<DollarBar> {
        let mut bars = Vec::new();
        let mut current: Option<(Decimal, BarBuilder)> = None;

        for trade in closed {
            let bucket = self.bucket_of(trade);
            match current.as_mut() {
                Some((open_bucket, builder)) if *open_bucket == bucket => builder.update(trade),
                _ => {
                    if let Some((_, builder)) = current.replace((bucket, BarBuilder::new(trade))) {
                        bars.push(builder.finish());
                    }
                }
            }
        }
        if let Some((_, builder)) = current {
            bars.push(builder.finish());
        }
        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use dollarbars_types::{CumulativeSums, Side};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// Trades with the given (side, price, notional), ids `1..`.
    fn trades(specs: &[(Side, i64, i64)]) -> Vec<Trade> {
        let start = DateTime::<Utc>::from_timestamp(1_600_000_000, 0).unwrap();
        let mut sums = CumulativeSums::ZERO;
        specs
            .iter()
            .enumerate()
            .map(|(i, &(side, price, notional))| {
                let notional = Decimal::from(notional);
                let price = Decimal::from(price);
                sums.add(side, notional);
                Trade {
                    timestamp: start + TimeDelta::seconds(i as i64),
                    id: (i + 1).to_string(),
                    side,
                    is_liquidation: false,
                    price,
                    amount: notional / price,
                    notional,
                    notional_cumsum: sums.notional,
                    buy_notional_cumsum: sums.buy,
                    sell_notional_cumsum: sums.sell,
                }
            })
            .collect()
    }

    fn buys(notionals: &[i64]) -> Vec<Trade> {
        let specs: Vec<_> = notionals.iter().map(|&n| (Side::Buy, 10, n)).collect();
        trades(&specs)
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        assert!(matches!(
            DollarBarAggregator::new(Decimal::ZERO),
            Err(DollarbarsError::InvalidInterval(_))
        ));
        assert!(DollarBarAggregator::new(d("-5")).is_err());
    }

    #[test]
    fn test_closure_rule() {
        // cumsums 50, 120, 180, 260, 340 -> buckets 0, 1, 1, 2, 3
        let tape = buys(&[50, 70, 60, 80, 80]);
        let mut aggregator = DollarBarAggregator::new(d("100")).unwrap();
        let buckets: Vec<_> = tape.iter().map(|t| aggregator.bucket_of(t)).collect();
        assert_eq!(buckets, [d("0"), d("1"), d("1"), d("2"), d("3")]);

        assert!(aggregator.push_page(tape[..1].to_vec()).is_empty());
        // 120 opens bucket 1 and closes bucket 0.
        let bars = aggregator.push_page(tape[1..3].to_vec());
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].notional_cumsum, d("50"));

        // 260 closes bucket 1; buckets 2 and 3 stay open.
        let bars = aggregator.push_page(tape[3..].to_vec());
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].trade_id_from, "2");
        assert_eq!(bars[0].trade_id, "3");
        assert_eq!(bars[0].notional_volume, d("130"));
        assert_eq!(bars[1].notional_cumsum, d("260"));

        assert_eq!(aggregator.pending().len(), 1);
        assert_eq!(aggregator.cursor(), Some(d("340")));
    }

    #[test]
    fn test_single_bucket_emits_nothing() {
        let mut aggregator = DollarBarAggregator::new(d("1000")).unwrap();
        assert!(aggregator.push_page(buys(&[10, 20, 30])).is_empty());
        assert_eq!(aggregator.pending().len(), 3);
        assert_eq!(aggregator.cursor(), Some(d("60")));
    }

    #[test]
    fn test_bar_fields_follow_arrival_order() {
        let tape = trades(&[
            (Side::Buy, 30, 20),
            (Side::Sell, 50, 30),
            (Side::Buy, 10, 40),
            (Side::Sell, 20, 5),
            (Side::Buy, 40, 10),
        ]);
        let mut aggregator = DollarBarAggregator::new(d("100")).unwrap();
        let bars = aggregator.push_page(tape);
        assert_eq!(bars.len(), 1);

        let bar = &bars[0];
        assert_eq!(bar.open, d("30"));
        assert_eq!(bar.close, d("20"));
        assert_eq!(bar.high, d("50"));
        assert_eq!(bar.low, d("10"));
        assert_eq!(bar.trade_id_from, "1");
        assert_eq!(bar.trade_id, "4");
        assert_eq!(bar.buy_notional_volume, d("60"));
        assert_eq!(bar.sell_notional_volume, d("35"));
        assert_eq!(bar.notional_volume, d("95"));
        assert_eq!(bar.buy_notional_volume + bar.sell_notional_volume, bar.notional_volume);
        assert_eq!(bar.notional_cumsum, d("95"));
        assert!(bar.cumulative_sums().is_balanced());
    }

    #[test]
    fn test_liquidation_volume_split_by_side() {
        let mut tape = trades(&[(Side::Buy, 10, 40), (Side::Sell, 10, 30), (Side::Sell, 10, 50)]);
        tape[0].is_liquidation = true;
        tape[1].is_liquidation = true;

        let mut aggregator = DollarBarAggregator::new(d("100")).unwrap();
        let bars = aggregator.push_page(tape);
        assert_eq!(bars[0].liquidation_buy_notional_volume, d("40"));
        assert_eq!(bars[0].liquidation_sell_notional_volume, d("30"));
    }

    #[test]
    fn test_large_trade_skips_buckets() {
        // cumsums 50, 450, 460 -> buckets 0, 4, 4
        let mut aggregator = DollarBarAggregator::new(d("100")).unwrap();
        let bars = aggregator.push_page(buys(&[50, 400, 10]));
        assert_eq!(bars.len(), 1);
        assert_eq!(aggregator.bucket_of(&aggregator.pending()[0]), d("4"));
    }

    #[test]
    fn test_fractional_interval() {
        let mut aggregator = DollarBarAggregator::new(d("0.5")).unwrap();
        let tape = buys(&[1, 1]);
        // cumsums 1, 2 -> buckets 2, 4
        let bars = aggregator.push_page(tape);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].notional_cumsum, d("1"));
    }
}
