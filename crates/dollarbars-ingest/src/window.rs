//! Adaptive request window.

/// Outcome of one windowed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFill {
    /// The page hit the exchange limit; trades may be missing.
    Truncated,
    /// The page was complete and more than 90% full.
    Full,
    /// The page was complete and less than 90% full.
    Sparse,
}

impl PageFill {
    /// Classifies a page of `count` trades against `page_limit`.
    #[must_use]
    pub const fn classify(count: usize, page_limit: u32) -> Self {
        let limit = page_limit as usize;
        if count >= limit {
            Self::Truncated
        } else if count * 10 < limit * 9 {
            Self::Sparse
        } else {
            Self::Full
        }
    }
}

/// Time window length that follows the density of the trade tape.
///
/// The length is always a positive multiple of the granularity and never
/// exceeds the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveWindow {
    len_ns: i64,
    granularity_ns: i64,
    max_ns: i64,
}

impl AdaptiveWindow {
    /// Creates a window starting at `seed_ns`, clamped to `[granularity, max]`.
    #[must_use]
    pub fn new(seed_ns: i64, granularity_ns: i64, max_ns: i64) -> Self {
        let granularity_ns = granularity_ns.max(1);
        let max_ns = floor_to(max_ns, granularity_ns).max(granularity_ns);
        let len_ns = floor_to(seed_ns.min(max_ns), granularity_ns).max(granularity_ns);
        Self {
            len_ns,
            granularity_ns,
            max_ns,
        }
    }

    /// Returns the current length in nanoseconds.
    #[must_use]
    pub const fn len_ns(&self) -> i64 {
        self.len_ns
    }

    /// Returns the granularity in nanoseconds.
    #[must_use]
    pub const fn granularity_ns(&self) -> i64 {
        self.granularity_ns
    }

    /// Returns true when the window cannot shrink any further.
    #[must_use]
    pub const fn is_minimal(&self) -> bool {
        self.len_ns <= self.granularity_ns
    }

    /// Halves the window, rounding down to the granularity.
    pub fn shrink(&mut self) {
        self.len_ns = floor_to(self.len_ns / 2, self.granularity_ns).max(self.granularity_ns);
    }

    /// Grows the window by 5%, rounding up to the granularity, capped at the maximum.
    pub fn grow(&mut self) {
        let g = i128::from(self.granularity_ns);
        let scaled = i128::from(self.len_ns) * 105;
        let units = (scaled + 100 * g - 1) / (100 * g);
        let grown = i64::try_from(units * g).unwrap_or(i64::MAX);
        self.len_ns = grown.min(self.max_ns).max(self.granularity_ns);
    }

    /// Applies the resize rule for a page and returns its classification.
    ///
    /// A truncated page shrinks the window, a sparse one grows it.
    pub fn observe(&mut self, count: usize, page_limit: u32) -> PageFill {
        let fill = PageFill::classify(count, page_limit);
        match fill {
            PageFill::Truncated => self.shrink(),
            PageFill::Sparse => self.grow(),
            PageFill::Full => {}
        }
        fill
    }
}

const fn floor_to(value: i64, unit: i64) -> i64 {
    value / unit * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: i64 = 1_000_000;
    const SEED: i64 = 30 * 60 * 1_000 * MS;

    #[test]
    fn test_seed_is_clamped() {
        let window = AdaptiveWindow::new(SEED, MS, 3_599_000 * MS);
        assert_eq!(window.len_ns(), SEED);

        let small_max = AdaptiveWindow::new(SEED, MS, 60_000 * MS);
        assert_eq!(small_max.len_ns(), 60_000 * MS);
    }

    #[test]
    fn test_shrink_halves_and_floors() {
        let mut window = AdaptiveWindow::new(3 * MS, MS, i64::MAX);
        window.shrink();
        assert_eq!(window.len_ns(), MS);
        window.shrink();
        assert_eq!(window.len_ns(), MS);
        assert!(window.is_minimal());

        let mut window = AdaptiveWindow::new(SEED, 1_000_000_000, i64::MAX);
        window.shrink();
        assert_eq!(window.len_ns(), 900 * 1_000_000_000);
    }

    #[test]
    fn test_grow_is_ceiling_and_capped() {
        let mut window = AdaptiveWindow::new(10 * MS, MS, 100 * MS);
        window.grow();
        // 10.5 units rounds up to 11
        assert_eq!(window.len_ns(), 11 * MS);

        let mut window = AdaptiveWindow::new(99 * MS, MS, 100 * MS);
        window.grow();
        assert_eq!(window.len_ns(), 100 * MS);
        window.grow();
        assert_eq!(window.len_ns(), 100 * MS);
    }

    #[test]
    fn test_grow_minimal_window_moves() {
        let mut window = AdaptiveWindow::new(MS, MS, 100 * MS);
        window.grow();
        assert_eq!(window.len_ns(), 2 * MS);
    }

    #[test]
    fn test_classify() {
        assert_eq!(PageFill::classify(1000, 1000), PageFill::Truncated);
        assert_eq!(PageFill::classify(1200, 1000), PageFill::Truncated);
        assert_eq!(PageFill::classify(900, 1000), PageFill::Full);
        assert_eq!(PageFill::classify(899, 1000), PageFill::Sparse);
        assert_eq!(PageFill::classify(0, 1000), PageFill::Sparse);
    }

    #[test]
    fn test_observe() {
        let mut window = AdaptiveWindow::new(SEED, MS, i64::MAX);
        assert_eq!(window.observe(1000, 1000), PageFill::Truncated);
        assert_eq!(window.len_ns(), SEED / 2);

        assert_eq!(window.observe(950, 1000), PageFill::Full);
        assert_eq!(window.len_ns(), SEED / 2);

        assert_eq!(window.observe(10, 1000), PageFill::Sparse);
        assert_eq!(window.len_ns(), SEED / 2 * 105 / 100);
    }
}
