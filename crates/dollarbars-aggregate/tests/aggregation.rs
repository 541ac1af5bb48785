//! Aggregation runs over stored trade tables.

use chrono::{DateTime, TimeDelta, Utc};
use dollarbars_aggregate::{
    AggregateConfig, AggregateObserver, AggregationOutcome, AggregationState, BarGenerator,
    run_aggregation,
};
use dollarbars_store::{MemoryStore, SqliteStore, TradeStore};
use dollarbars_types::{
    BarSeries, CumulativeSums, Decimal, DollarbarsError, ExchangeId, Market, Side,
    Trade,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn market() -> Market {
    Market::new(ExchangeId::Binance, "BTC/USDT")
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// `count` trades of 30 notional each, every third one a sell, continuing
/// from `sums` and id `first_id`.
fn tape_from(first_id: usize, count: usize, sums: &mut CumulativeSums) -> Vec<Trade> {
    let start = DateTime::<Utc>::from_timestamp(1_609_459_200, 0).unwrap();
    (first_id..first_id + count)
        .map(|i| {
            let side = if i % 3 == 0 { Side::Sell } else { Side::Buy };
            let price = Decimal::from(10 + (i % 5) as i64);
            let notional = Decimal::from(30);
            sums.add(side, notional);
            Trade {
                timestamp: start + TimeDelta::seconds(i as i64),
                id: i.to_string(),
                side,
                is_liquidation: i % 11 == 0,
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

fn store_with(trades: &[Trade]) -> MemoryStore {
    let store = MemoryStore::new();
    store.ensure_trade_table(&market()).unwrap();
    store.append_trades(&market(), trades).unwrap();
    store
}

fn series() -> BarSeries {
    BarSeries::new(market(), d("100"))
}

fn generate(store: &dyn TradeStore, page_size: usize) -> AggregationOutcome {
    BarGenerator::new(store, series(), AggregateConfig { page_size })
        .unwrap()
        .run()
        .unwrap()
}

#[test]
fn test_complete_run() {
    let trades = tape_from(1, 100, &mut CumulativeSums::ZERO);
    let store = store_with(&trades);

    let outcome = run_aggregation(&store, &market(), d("100")).unwrap();
    // Cumsum 3000 opens bucket 30, buckets 0..=29 are closed.
    assert_eq!(outcome, AggregationOutcome::Drained { bars: 30, trades_read: 100 });

    let bars = store.bars(&series()).unwrap();
    assert_eq!(bars.len(), 30);
    for (i, bar) in bars.iter().enumerate() {
        assert_eq!(bar.bucket(d("100")), Decimal::from(i as i64));
        assert_eq!(bar.buy_notional_volume + bar.sell_notional_volume, bar.notional_volume);
        assert!(bar.cumulative_sums().is_balanced());
        assert!(bar.low <= bar.open && bar.open <= bar.high);
        assert!(bar.low <= bar.close && bar.close <= bar.high);
    }

    let volume: Decimal = bars.iter().map(|b| b.notional_volume).sum();
    assert_eq!(volume, bars[29].notional_cumsum);
    assert_eq!(bars[0].trade_id_from, "1");
    for pair in bars.windows(2) {
        assert_eq!(pair[1].notional_cumsum - pair[1].notional_volume, pair[0].notional_cumsum);
    }
}

#[test]
fn test_rerun_adds_no_bars() {
    let trades = tape_from(1, 100, &mut CumulativeSums::ZERO);
    let store = store_with(&trades);

    generate(&store, 16);
    let before = store.bars(&series()).unwrap();

    let outcome = generate(&store, 16);
    // Only the open bucket is replayed, it holds the trade at 3000.
    assert_eq!(outcome, AggregationOutcome::Drained { bars: 0, trades_read: 1 });
    assert_eq!(store.bars(&series()).unwrap(), before);
}

#[test]
fn test_resumed_run_matches_single_run() {
    let mut sums = CumulativeSums::ZERO;
    let head = tape_from(1, 47, &mut sums);
    let tail = tape_from(48, 53, &mut sums);
    let all: Vec<Trade> = head.iter().chain(&tail).cloned().collect();

    let single = store_with(&all);
    generate(&single, 10_000);

    let resumed = store_with(&head);
    generate(&resumed, 7);
    resumed.append_trades(&market(), &tail).unwrap();
    generate(&resumed, 7);

    assert_eq!(resumed.bars(&series()).unwrap(), single.bars(&series()).unwrap());
}

#[test]
fn test_page_size_does_not_change_bars() {
    let trades = tape_from(1, 64, &mut CumulativeSums::ZERO);
    let one_by_one = store_with(&trades);
    let whole = store_with(&trades);

    generate(&one_by_one, 1);
    generate(&whole, 10_000);

    assert_eq!(one_by_one.bars(&series()).unwrap(), whole.bars(&series()).unwrap());
}

#[test]
fn test_cold_start_mid_tape() {
    // Table whose first trade sits deep inside bucket 12.
    let mut sums = CumulativeSums::new(d("1234.5"), d("1000"), d("234.5"));
    let trades = tape_from(500, 20, &mut sums);
    let store = store_with(&trades);

    generate(&store, 5);
    let bars = store.bars(&series()).unwrap();
    assert_eq!(bars[0].trade_id_from, "500");
    assert_eq!(bars[0].bucket(d("100")), d("12"));
    assert_eq!(bars[0].notional_volume, d("60"));
}

#[test]
fn test_no_trades_is_no_data() {
    let store = MemoryStore::new();
    assert_eq!(
        run_aggregation(&store, &market(), d("100")).unwrap(),
        AggregationOutcome::NoData
    );

    store.ensure_trade_table(&market()).unwrap();
    let mut generator = BarGenerator::new(&store, series(), AggregateConfig::default()).unwrap();
    assert_eq!(generator.step().unwrap(), AggregationState::NoData);
    assert_eq!(generator.step().unwrap(), AggregationState::NoData);
}

#[test]
fn test_invalid_interval() {
    let store = MemoryStore::new();
    for interval in ["0", "-100"] {
        assert!(matches!(
            run_aggregation(&store, &market(), d(interval)),
            Err(DollarbarsError::InvalidInterval(_))
        ));
    }
}

#[test]
fn test_state_transitions() {
    let trades = tape_from(1, 10, &mut CumulativeSums::ZERO);
    let store = store_with(&trades);
    let mut generator =
        BarGenerator::new(&store, series(), AggregateConfig { page_size: 6 }).unwrap();

    assert_eq!(generator.state(), AggregationState::SeekingResumePoint);
    assert_eq!(
        generator.step().unwrap(),
        AggregationState::Streaming { cursor: Decimal::ZERO, tail: d("300") }
    );
    assert_eq!(
        generator.step().unwrap(),
        AggregationState::Streaming { cursor: d("180"), tail: d("300") }
    );
    assert_eq!(
        generator.step().unwrap(),
        AggregationState::Streaming { cursor: d("300"), tail: d("300") }
    );
    assert_eq!(generator.step().unwrap(), AggregationState::Drained);
}

#[derive(Default)]
struct Counting {
    starts: AtomicUsize,
    pages: AtomicUsize,
    bars: AtomicUsize,
}

impl AggregateObserver for Counting {
    fn on_start(&self, _head: Decimal, _tail: Decimal) {
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    fn on_page(&self, _cursor: Decimal, bars: usize) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.bars.fetch_add(bars, Ordering::Relaxed);
    }
}

#[test]
fn test_observer() {
    let trades = tape_from(1, 40, &mut CumulativeSums::ZERO);
    let store = store_with(&trades);
    let observer = Counting::default();

    let outcome = BarGenerator::new(&store, series(), AggregateConfig { page_size: 10 })
        .unwrap()
        .with_observer(&observer)
        .run()
        .unwrap();

    assert_eq!(outcome, AggregationOutcome::Drained { bars: 12, trades_read: 40 });
    assert_eq!(observer.starts.load(Ordering::Relaxed), 1);
    assert_eq!(observer.pages.load(Ordering::Relaxed), 4);
    assert_eq!(observer.bars.load(Ordering::Relaxed), 12);
}

#[test]
fn test_sqlite_store_resume() {
    let dir = tempfile::tempdir().unwrap();
    let trades = tape_from(1, 100, &mut CumulativeSums::ZERO);
    {
        let store = SqliteStore::in_dir(dir.path()).unwrap();
        store.ensure_trade_table(&market()).unwrap();
        store.append_trades(&market(), &trades[..60]).unwrap();
        generate(&store, 25);
    }

    let store = SqliteStore::in_dir(dir.path()).unwrap();
    store.append_trades(&market(), &trades[60..]).unwrap();
    let outcome = generate(&store, 25);
    assert!(matches!(outcome, AggregationOutcome::Drained { bars: 12, .. }));

    let latest = store.get_latest_bar(&series()).unwrap().unwrap();
    assert_eq!(latest.notional_cumsum, d("2970"));
    assert_eq!(latest.bucket(d("100")), d("29"));
}
