//! Fixtures shared by the adapter tests.

use chrono::{DateTime, TimeDelta, Utc};
use dollarbars_types::{CumulativeSums, Decimal, ExchangeId, Market, Side, Trade};

pub(crate) fn market() -> Market {
    Market::new(ExchangeId::Binance, "BTC/USDT")
}

/// Buy trades with the given notionals, ids `1..`, one second apart.
pub(crate) fn trades(notionals: &[i64]) -> Vec<Trade> {
    let start = DateTime::<Utc>::from_timestamp(1_600_000_000, 0).unwrap();
    let mut sums = CumulativeSums::ZERO;
    notionals
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let notional = Decimal::from(n);
            sums.add(Side::Buy, notional);
            Trade {
                timestamp: start + TimeDelta::seconds(i as i64),
                id: (i + 1).to_string(),
                side: Side::Buy,
                is_liquidation: false,
                price: notional,
                amount: Decimal::ONE,
                notional,
                notional_cumsum: sums.notional,
                buy_notional_cumsum: sums.buy,
                sell_notional_cumsum: sums.sell,
            }
        })
        .collect()
}
