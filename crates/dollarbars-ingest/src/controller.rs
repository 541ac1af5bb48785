//! The ingestion loop.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use dollarbars_exchanges::{ExchangeProfile, ExchangeRegistry, FetchMode, FetchWindow, params_for};
use dollarbars_fetch::{SnapshotSource, TradeSource};
use dollarbars_store::TradeStore;
use dollarbars_types::{DollarbarsError, Market, RawTrade, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    AdaptiveWindow, BatchNormalizer, Clock, IngestConfig, IngestObserver, IngestProgress,
    IngestSummary, PageFill, SortOrder, SystemClock,
};

/// Where trades of one exchange come from.
#[derive(Clone, Copy)]
pub enum Feed<'a> {
    /// A paginated trade API.
    Paged(&'a dyn TradeSource),
    /// Published daily trade files.
    Snapshots(&'a dyn SnapshotSource),
}

impl std::fmt::Debug for Feed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paged(source) => write!(f, "Paged({})", source.exchange()),
            Self::Snapshots(source) => write!(f, "Snapshots({})", source.exchange()),
        }
    }
}

fn to_ns(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_micros().saturating_mul(1_000)
}

/// Downloads trades of one exchange/symbol into a store.
///
/// Each run resumes from the latest stored trade, so a run that was
/// interrupted or aborted can simply be started again.
pub struct IngestController<'a> {
    registry: &'a ExchangeRegistry,
    store: &'a dyn TradeStore,
    config: IngestConfig,
    clock: Arc<dyn Clock>,
    observer: Option<&'a dyn IngestObserver>,
}

impl std::fmt::Debug for IngestController<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestController")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<'a> IngestController<'a> {
    /// Creates a controller with default settings and the wall clock.
    #[must_use]
    pub fn new(registry: &'a ExchangeRegistry, store: &'a dyn TradeStore) -> Self {
        Self {
            registry,
            store,
            config: IngestConfig::default(),
            clock: Arc::new(SystemClock),
            observer: None,
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn IngestObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Brings the trade table of `symbol` up to date.
    ///
    /// `since` is only used when the table is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange is unknown, its profile does not match
    /// the feed, the exchange rejects a request, or the store fails. Trades
    /// appended before the error stay stored.
    pub async fn run(
        &self,
        feed: Feed<'_>,
        symbol: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<IngestSummary> {
        let exchange = match feed {
            Feed::Paged(source) => source.exchange(),
            Feed::Snapshots(source) => source.exchange(),
        };
        let profile = self.registry.require(exchange)?;
        let market = Market::new(exchange, symbol);

        let result = match (profile.fetch_mode(), feed) {
            (FetchMode::Windowed, Feed::Paged(source)) => {
                self.run_windowed(profile, source, &market, since).await
            }
            (FetchMode::Cursor, Feed::Paged(source)) => {
                self.run_cursor(profile, source, &market, since).await
            }
            (FetchMode::DailySnapshot, Feed::Snapshots(source)) => {
                self.run_snapshots(source, &market, since).await
            }
            (mode, feed) => Err(DollarbarsError::Protocol(format!(
                "{exchange} is fetched in {mode:?} mode, got {feed:?}"
            ))),
        };

        match &result {
            Ok(summary) => {
                info!(
                    %market,
                    trades = summary.trades,
                    batches = summary.batches,
                    requests = summary.requests,
                    "ingestion finished"
                );
                if let Some(observer) = self.observer {
                    observer.on_finish(summary);
                }
            }
            Err(e) => error!(%market, error = %e, "ingestion aborted"),
        }
        result
    }

    /// Opens the trade table and returns the start position and normalizer.
    fn resume(
        &self,
        market: &Market,
        order: SortOrder,
        granularity: TimeDelta,
        since: Option<DateTime<Utc>>,
    ) -> Result<(DateTime<Utc>, BatchNormalizer)> {
        self.store.ensure_trade_table(market)?;
        match self.store.get_latest_trade(market)? {
            Some(latest) => {
                info!(
                    %market,
                    timestamp = %latest.timestamp,
                    id = %latest.id,
                    cumsum = %latest.notional_cumsum,
                    "resuming after last stored trade"
                );
                let start = latest.timestamp + granularity;
                let normalizer = BatchNormalizer::resume_from(order, &latest);
                Ok((start, normalizer))
            }
            None => Ok((
                since.unwrap_or(self.config.default_since),
                BatchNormalizer::new(order),
            )),
        }
    }

    /// Normalizes and stores one page. Returns the number of trades appended.
    fn persist(
        &self,
        market: &Market,
        normalizer: &mut BatchNormalizer,
        raw: Vec<RawTrade>,
        summary: &mut IngestSummary,
    ) -> Result<usize> {
        let trades = normalizer.normalize(raw)?;
        if trades.is_empty() {
            return Ok(0);
        }
        self.store.append_trades(market, &trades)?;
        normalizer.commit(&trades);

        let sums = normalizer.sums();
        if let Some(last) = trades.last() {
            info!(
                %market,
                trades = trades.len(),
                last = %last.timestamp,
                cumsum = %sums.notional,
                "appended batch"
            );
        }
        summary.batches += 1;
        summary.trades += trades.len() as u64;
        summary.final_sums = Some(sums);
        Ok(trades.len())
    }

    /// Whether `day` closed longer than the missing-file grace period ago.
    fn is_past_grace(&self, day: NaiveDate) -> Result<bool> {
        let closed = next_day(day)?.and_time(chrono::NaiveTime::MIN).and_utc();
        Ok(self.clock.now() - closed >= self.config.snapshot_missing_grace)
    }

    fn report(&self, progress: IngestProgress) {
        if let Some(observer) = self.observer {
            observer.on_progress(&progress);
        }
    }

    async fn run_windowed(
        &self,
        profile: &ExchangeProfile,
        source: &dyn TradeSource,
        market: &Market,
        since: Option<DateTime<Utc>>,
    ) -> Result<IngestSummary> {
        let granularity = profile.window_granularity();
        let (from, mut normalizer) = self.resume(market, SortOrder::NativeId, granularity, since)?;
        let until = self.clock.now();
        if let Some(observer) = self.observer {
            observer.on_start(market, from, until);
        }

        let params = params_for(profile.id());
        let delay = profile.request_delay(source.min_request_spacing());
        let step_ns = if profile.advance_by_window_end() {
            granularity.num_nanoseconds().unwrap_or(0)
        } else {
            0
        };
        let seed_ns = self.config.seed_window.num_nanoseconds().unwrap_or(i64::MAX);
        let mut window = AdaptiveWindow::new(
            seed_ns,
            profile.window_granularity_ns(),
            profile.max_window_ns(),
        );

        let until_ns = to_ns(until);
        let mut start_ns = to_ns(from);
        let mut summary = IngestSummary::default();

        while start_ns < until_ns {
            tokio::time::sleep(delay).await;

            let end_ns = start_ns.saturating_add(window.len_ns());
            let query = params.build(&FetchWindow::Range { start_ns, end_ns }, profile.page_limit());
            summary.requests += 1;

            let raw = match source.fetch_trades(&market.symbol, &query).await {
                Ok(raw) => raw,
                Err(e) if e.is_transient() => {
                    warn!(%market, error = %e, "transient failure, retrying window");
                    summary.transient_retries += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let count = raw.len();
            let was_minimal = window.is_minimal();
            match window.observe(count, profile.page_limit()) {
                PageFill::Truncated if !was_minimal => {
                    debug!(
                        %market,
                        count,
                        window_ns = window.len_ns(),
                        "page truncated, shrinking window"
                    );
                    summary.truncated_retries += 1;
                    continue;
                }
                PageFill::Truncated => {
                    warn!(
                        %market,
                        count,
                        start = %DateTime::<Utc>::from_timestamp_nanos(start_ns),
                        "page truncated at minimum window, trades may be missing"
                    );
                }
                PageFill::Full | PageFill::Sparse => {}
            }

            self.persist(market, &mut normalizer, raw, &mut summary)?;
            start_ns = end_ns.saturating_add(step_ns);

            self.report(IngestProgress {
                position: DateTime::<Utc>::from_timestamp_nanos(end_ns.min(until_ns)),
                window: Some(TimeDelta::nanoseconds(window.len_ns())),
                page_len: count,
                trades: summary.trades,
            });
        }
        Ok(summary)
    }

    async fn run_cursor(
        &self,
        profile: &ExchangeProfile,
        source: &dyn TradeSource,
        market: &Market,
        since: Option<DateTime<Utc>>,
    ) -> Result<IngestSummary> {
        let granularity = profile.window_granularity();
        let (from, mut normalizer) = self.resume(market, SortOrder::NativeId, granularity, since)?;
        if let Some(observer) = self.observer {
            observer.on_start(market, from, self.clock.now());
        }

        let params = params_for(profile.id());
        let delay = profile.request_delay(source.min_request_spacing());
        let mut position = from;
        let mut next = FetchWindow::Range {
            start_ns: to_ns(from),
            end_ns: to_ns(self.clock.now()),
        };
        let mut summary = IngestSummary::default();

        // The bound moves with the tape, re-read it every pass.
        while position < self.clock.now() {
            tokio::time::sleep(delay).await;

            let query = params.build(&next, profile.page_limit());
            summary.requests += 1;

            let raw = match source.fetch_trades(&market.symbol, &query).await {
                Ok(raw) => raw,
                Err(e) if e.is_transient() => {
                    warn!(%market, error = %e, "transient failure, retrying cursor");
                    summary.transient_retries += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Some(last_timestamp) = raw.iter().map(|t| t.timestamp).max() else {
                debug!(%market, "empty page, tape exhausted");
                break;
            };
            let count = raw.len();
            let cursor = raw.iter().rev().find_map(|t| t.cursor.clone());

            self.persist(market, &mut normalizer, raw, &mut summary)?;

            let following = match cursor {
                Some(since) => FetchWindow::Cursor { since },
                None => FetchWindow::Range {
                    start_ns: to_ns(last_timestamp + granularity),
                    end_ns: to_ns(self.clock.now()),
                },
            };
            if following == next {
                warn!(%market, "cursor did not advance, stopping");
                break;
            }
            next = following;
            position = last_timestamp;

            self.report(IngestProgress {
                position,
                window: None,
                page_len: count,
                trades: summary.trades,
            });
        }
        Ok(summary)
    }

    async fn run_snapshots(
        &self,
        source: &dyn SnapshotSource,
        market: &Market,
        since: Option<DateTime<Utc>>,
    ) -> Result<IngestSummary> {
        self.store.ensure_trade_table(market)?;
        let (mut day, mut normalizer) = match self.store.get_latest_trade(market)? {
            Some(latest) => {
                let day = next_day(latest.timestamp.date_naive())?;
                info!(%market, %day, cumsum = %latest.notional_cumsum, "resuming with next snapshot day");
                (day, BatchNormalizer::resume_from(SortOrder::Timestamp, &latest))
            }
            None => (
                since.map_or(self.config.snapshot_epoch, |s| s.date_naive()),
                BatchNormalizer::new(SortOrder::Timestamp),
            ),
        };

        if let Some(observer) = self.observer {
            let from = day.and_time(chrono::NaiveTime::MIN).and_utc();
            let until = self.clock.now().date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
            observer.on_start(market, from, until);
        }

        let mut summary = IngestSummary::default();
        let mut attempts: u32 = 0;
        // Only complete days are published.
        while day < self.clock.now().date_naive() {
            summary.requests += 1;
            attempts += 1;
            let raw = match source.fetch_day(&market.symbol, day).await {
                Ok(Some(raw)) => raw,
                Ok(None) if self.is_past_grace(day)? => {
                    info!(%market, %day, "no snapshot for day, skipping");
                    summary.skipped_days += 1;
                    day = next_day(day)?;
                    attempts = 0;
                    continue;
                }
                Ok(None) => {
                    warn!(%market, %day, attempt = attempts, "snapshot not published yet, retrying");
                    summary.transient_retries += 1;
                    tokio::time::sleep(self.config.snapshot_retry_delay).await;
                    continue;
                }
                Err(e) => {
                    warn!(%market, %day, attempt = attempts, error = %e, "snapshot failed, retrying");
                    summary.transient_retries += 1;
                    tokio::time::sleep(self.config.snapshot_retry_delay).await;
                    continue;
                }
            };

            let count = raw.len();
            self.persist(market, &mut normalizer, raw, &mut summary)?;
            day = next_day(day)?;
            attempts = 0;

            self.report(IngestProgress {
                position: day.and_time(chrono::NaiveTime::MIN).and_utc(),
                window: None,
                page_len: count,
                trades: summary.trades,
            });
        }
        Ok(summary)
    }
}

fn next_day(day: NaiveDate) -> Result<NaiveDate> {
    day.succ_opt()
        .ok_or_else(|| DollarbarsError::Parse(format!("no day after {day}")))
}

/// Runs one ingestion with default settings.
///
/// # Errors
///
/// See [`IngestController::run`].
pub async fn run_ingestion(
    registry: &ExchangeRegistry,
    store: &dyn TradeStore,
    feed: Feed<'_>,
    symbol: &str,
    since: Option<DateTime<Utc>>,
) -> Result<IngestSummary> {
    IngestController::new(registry, store)
        .run(feed, symbol, since)
        .await
}
