//! Resumable aggregation runs over a trade store.

use dollarbars_store::TradeStore;
use dollarbars_types::{BarSeries, Decimal, Market, Result};
use tracing::{debug, info};

use crate::DollarBarAggregator;

/// Aggregation run settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateConfig {
    /// Trades read from the store per page.
    pub page_size: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self { page_size: 10_000 }
    }
}

/// Where a [`BarGenerator`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationState {
    /// Resume point not determined yet.
    SeekingResumePoint,
    /// Reading trades after `cursor`; `tail` is the latest stored cumsum.
    Streaming {
        /// Exclusive lower bound of the next page.
        cursor: Decimal,
        /// Cumulative sum of the latest stored trade when the run started.
        tail: Decimal,
    },
    /// Every stored trade has been read.
    Drained,
    /// The trade table holds no trades.
    NoData,
}

impl AggregationState {
    /// Returns true once the run cannot make further progress.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Drained | Self::NoData)
    }
}

/// Result of an aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// No trades were stored for the market.
    NoData,
    /// All stored trades were read.
    Drained {
        /// Bars appended during this run.
        bars: u64,
        /// Trades read from the store during this run.
        trades_read: u64,
    },
}

/// Receives progress callbacks from a [`BarGenerator`].
pub trait AggregateObserver: Send + Sync {
    /// Called once the resume point is known.
    fn on_start(&self, _head: Decimal, _tail: Decimal) {}

    /// Called after every page with the new cursor and the bars it closed.
    fn on_page(&self, _cursor: Decimal, _bars: usize) {}
}

/// Turns the stored trades of one market into dollar bars, resuming after
/// the last stored bar.
///
/// Trades of the newest bucket stay buffered and are not written; a later
/// run replays them from the last bar's closing cumsum.
pub struct BarGenerator<'a> {
    store: &'a dyn TradeStore,
    series: BarSeries,
    config: AggregateConfig,
    aggregator: DollarBarAggregator,
    state: AggregationState,
    observer: Option<&'a dyn AggregateObserver>,
    bars: u64,
    trades_read: u64,
}

impl std::fmt::Debug for BarGenerator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarGenerator")
            .field("series", &self.series)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("bars", &self.bars)
            .field("trades_read", &self.trades_read)
            .finish_non_exhaustive()
    }
}

impl<'a> BarGenerator<'a> {
    /// Creates a generator for `series`.
    ///
    /// # Errors
    ///
    /// Returns [`dollarbars_types::DollarbarsError::InvalidInterval`] unless
    /// the interval is positive.
    pub fn new(store: &'a dyn TradeStore, series: BarSeries, config: AggregateConfig) -> Result<Self> {
        let aggregator = DollarBarAggregator::new(series.interval)?;
        Ok(Self {
            store,
            series,
            config,
            aggregator,
            state: AggregationState::SeekingResumePoint,
            observer: None,
            bars: 0,
            trades_read: 0,
        })
    }

    /// Attaches a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn AggregateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> AggregationState {
        self.state
    }

    /// Returns the series being generated.
    #[must_use]
    pub const fn series(&self) -> &BarSeries {
        &self.series
    }

    /// Performs one transition and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written. No bar of the
    /// failed page is persisted; a new generator resumes from the last bar.
    pub fn step(&mut self) -> Result<AggregationState> {
        self.state = match self.state {
            AggregationState::SeekingResumePoint => self.seek()?,
            AggregationState::Streaming { cursor, tail } => self.stream(cursor, tail)?,
            terminal => terminal,
        };
        Ok(self.state)
    }

    /// Steps until a terminal state.
    ///
    /// # Errors
    ///
    /// Returns the first store error.
    pub fn run(mut self) -> Result<AggregationOutcome> {
        while !self.step()?.is_terminal() {}

        Ok(match self.state {
            AggregationState::NoData => AggregationOutcome::NoData,
            _ => {
                info!(
                    table = %self.series.bar_table(),
                    bars = self.bars,
                    trades_read = self.trades_read,
                    open_trades = self.aggregator.pending().len(),
                    "aggregation drained"
                );
                AggregationOutcome::Drained {
                    bars: self.bars,
                    trades_read: self.trades_read,
                }
            }
        })
    }

    fn seek(&self) -> Result<AggregationState> {
        let market = &self.series.market;
        self.store.ensure_bar_table(&self.series)?;

        let (Some(first), Some(latest)) = (
            self.store.get_first_trade(market)?,
            self.store.get_latest_trade(market)?,
        ) else {
            info!(%market, "no trades stored, nothing to aggregate");
            return Ok(AggregationState::NoData);
        };

        let head = match self.store.get_latest_bar(&self.series)? {
            Some(bar) => bar.notional_cumsum,
            None => first.notional_cumsum_before(),
        };
        let tail = latest.notional_cumsum;
        info!(table = %self.series.bar_table(), %head, %tail, "resuming aggregation");
        if let Some(observer) = self.observer {
            observer.on_start(head, tail);
        }
        Ok(AggregationState::Streaming { cursor: head, tail })
    }

    fn stream(&mut self, cursor: Decimal, tail: Decimal) -> Result<AggregationState> {
        let page = self
            .store
            .query_trades_page(&self.series.market, cursor, self.config.page_size)?;
        let Some(last) = page.last() else {
            return Ok(AggregationState::Drained);
        };
        let next_cursor = last.notional_cumsum;
        let page_len = page.len();

        let bars = self.aggregator.push_page(page);
        if let Some(newest) = bars.last() {
            self.store.append_bars(&self.series, &bars)?;
            info!(
                table = %self.series.bar_table(),
                count = bars.len(),
                until = %newest.timestamp,
                "appended bars"
            );
        }
        debug!(%next_cursor, %tail, page_len, "page aggregated");

        self.trades_read += page_len as u64;
        self.bars += bars.len() as u64;
        if let Some(observer) = self.observer {
            observer.on_page(next_cursor, bars.len());
        }
        Ok(AggregationState::Streaming {
            cursor: next_cursor,
            tail,
        })
    }
}

/// Generates dollar bars of `interval` notional for `market` with the default
/// configuration.
///
/// # Errors
///
/// Returns an error if the interval is not positive or the store fails.
pub fn run_aggregation(
    store: &dyn TradeStore,
    market: &Market,
    interval: Decimal,
) -> Result<AggregationOutcome> {
    let series = BarSeries::new(market.clone(), interval);
    BarGenerator::new(store, series, AggregateConfig::default())?.run()
}
