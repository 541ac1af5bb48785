//! Ingestion settings and time source.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::fmt::Debug;
use std::time::Duration;

/// 2021-01-01T00:00:00Z.
const DEFAULT_SINCE_SECS: i64 = 1_609_459_200;
/// 2019-10-01, first day of published Bybit trade files.
const SNAPSHOT_EPOCH_DAYS: i64 = 18_170;

/// Settings of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Window length of the first windowed request.
    pub seed_window: TimeDelta,
    /// Start of the download when the table is empty and no start was given.
    pub default_since: DateTime<Utc>,
    /// First snapshot day when the table is empty and no start was given.
    pub snapshot_epoch: NaiveDate,
    /// Pause before retrying a snapshot day that failed or is not published yet.
    pub snapshot_retry_delay: Duration,
    /// A day whose snapshot is still missing this long after it closed has no
    /// trades and is skipped. Younger missing days are waited for.
    pub snapshot_missing_grace: TimeDelta,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            seed_window: TimeDelta::minutes(30),
            default_since: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(DEFAULT_SINCE_SECS),
            snapshot_epoch: (DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(SNAPSHOT_EPOCH_DAYS))
                .date_naive(),
            snapshot_retry_delay: Duration::from_secs(3),
            snapshot_missing_grace: TimeDelta::days(2),
        }
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.seed_window, TimeDelta::minutes(30));
        assert_eq!(config.default_since.to_rfc3339(), "2021-01-01T00:00:00+00:00");
        assert_eq!(config.snapshot_epoch, NaiveDate::from_ymd_opt(2019, 10, 1).unwrap());
        assert_eq!(config.snapshot_retry_delay, Duration::from_secs(3));
        assert_eq!(config.snapshot_missing_grace, TimeDelta::days(2));
    }
}
