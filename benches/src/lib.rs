//! Benchmark utilities for dollarbars.

use chrono::{DateTime, TimeDelta, Utc};
use dollarbars_lib::{
    CumulativeSums, Decimal, ExchangeId, Market, MemoryStore, RawTrade, Side, Trade, TradeStore,
};

/// Market used by every benchmark.
pub fn bench_market() -> Market {
    Market::new(ExchangeId::Binance, "BTC/USDT")
}

/// Deterministic pseudo-random tape of `len` raw trades, 100ms apart.
///
/// Prices wander around 30 000 and amounts span three orders of magnitude,
/// roughly like a liquid spot market.
pub fn raw_tape(len: usize) -> Vec<RawTrade> {
    let start = DateTime::<Utc>::from_timestamp(1_609_459_200, 0).unwrap_or_default();
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..len)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let side = if state & 1 == 0 { Side::Buy } else { Side::Sell };
            let price = Decimal::new(3_000_000 + (state % 20_000) as i64, 2);
            let amount = Decimal::new(1 + (state >> 20) as i64 % 50_000, 5);
            RawTrade::new(
                start + TimeDelta::milliseconds(100 * i as i64),
                (i + 1).to_string(),
                side,
                price.to_string(),
                amount.to_string(),
            )
        })
        .collect()
}

/// Normalized tape of `len` trades with exact running sums.
pub fn tape(len: usize) -> Vec<Trade> {
    let mut sums = CumulativeSums::ZERO;
    raw_tape(len)
        .into_iter()
        .map(|raw| {
            let price: Decimal = raw.price.parse().unwrap_or_default();
            let amount: Decimal = raw.amount.parse().unwrap_or_default();
            let notional = price * amount;
            sums.add(raw.side, notional);
            Trade {
                timestamp: raw.timestamp,
                id: raw.id,
                side: raw.side,
                is_liquidation: false,
                price,
                amount,
                notional,
                notional_cumsum: sums.notional,
                buy_notional_cumsum: sums.buy,
                sell_notional_cumsum: sums.sell,
            }
        })
        .collect()
}

/// Writes `trades` into `store` under [`bench_market`].
///
/// # Panics
///
/// Panics if the store rejects the trades.
pub fn seed(store: &dyn TradeStore, trades: &[Trade]) {
    let market = bench_market();
    store.ensure_trade_table(&market).expect("create trade table");
    store.append_trades(&market, trades).expect("append trades");
}

/// In-memory store holding a tape of `len` trades.
pub fn seeded_memory_store(len: usize) -> MemoryStore {
    let store = MemoryStore::new();
    seed(&store, &tape(len));
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tape_is_deterministic_and_balanced() {
        let a = tape(1_000);
        let b = tape(1_000);
        assert_eq!(a, b);

        let last = a.last().unwrap();
        assert!(last.cumulative_sums().is_balanced());
        assert!(a.windows(2).all(|w| w[0].notional_cumsum < w[1].notional_cumsum));
    }
}
