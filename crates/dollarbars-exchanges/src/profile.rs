//! Exchange download profile.

use chrono::TimeDelta;
use dollarbars_types::ExchangeId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How trades are paged out of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Time windows of adaptive length, bounded by `max_window_ns`.
    Windowed,
    /// Continue from the native cursor of the last returned record.
    Cursor,
    /// Pre-published daily snapshot files instead of a paginated API.
    DailySnapshot,
}

/// Static download parameters of one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeProfile {
    /// Exchange this profile applies to.
    id: ExchangeId,
    /// Maximum trades per request, 0 when the exchange does not page by count.
    page_limit: u32,
    /// Upper bound on the window length in nanoseconds; non-positive disables windowing.
    max_window_ns: i64,
    /// Unit window bounds are rounded to, in nanoseconds.
    window_granularity_ns: i64,
    /// Whether the next window starts one granularity unit after the previous end.
    advance_by_window_end: bool,
    /// Scale applied to the exchange's advertised request spacing.
    rate_limit_multiplier: f64,
}

impl ExchangeProfile {
    /// Creates a new profile.
    #[must_use]
    pub const fn new(
        id: ExchangeId,
        page_limit: u32,
        max_window_ns: i64,
        window_granularity_ns: i64,
        advance_by_window_end: bool,
        rate_limit_multiplier: f64,
    ) -> Self {
        Self {
            id,
            page_limit,
            max_window_ns,
            window_granularity_ns,
            advance_by_window_end,
            rate_limit_multiplier,
        }
    }

    /// Returns the exchange identifier.
    #[must_use]
    pub const fn id(&self) -> ExchangeId {
        self.id
    }

    /// Returns the maximum number of trades per request.
    #[must_use]
    pub const fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Returns the maximum window length in nanoseconds.
    #[must_use]
    pub const fn max_window_ns(&self) -> i64 {
        self.max_window_ns
    }

    /// Returns the window granularity in nanoseconds.
    #[must_use]
    pub const fn window_granularity_ns(&self) -> i64 {
        self.window_granularity_ns
    }

    /// Returns the window granularity as a time delta.
    #[must_use]
    pub fn window_granularity(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.window_granularity_ns)
    }

    /// Returns whether windows advance one granularity unit past the previous end.
    #[must_use]
    pub const fn advance_by_window_end(&self) -> bool {
        self.advance_by_window_end
    }

    /// Returns the rate limit multiplier.
    #[must_use]
    pub const fn rate_limit_multiplier(&self) -> f64 {
        self.rate_limit_multiplier
    }

    /// Returns how trades are paged out of this exchange.
    #[must_use]
    pub const fn fetch_mode(&self) -> FetchMode {
        if self.page_limit == 0 && self.max_window_ns <= 0 {
            FetchMode::DailySnapshot
        } else if self.max_window_ns > 0 {
            FetchMode::Windowed
        } else {
            FetchMode::Cursor
        }
    }

    /// Scales the exchange's minimum request spacing by the profile multiplier.
    #[must_use]
    pub fn request_delay(&self, min_spacing: Duration) -> Duration {
        min_spacing.mul_f64(self.rate_limit_multiplier.max(0.0))
    }
}
