//! Progress reporting for the dollarbars CLI.

use chrono::{DateTime, Utc};
use dollarbars_lib::prelude::*;
use dollarbars_lib::{AggregateObserver, IngestObserver, IngestProgress, IngestSummary};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::prelude::ToPrimitive;
use std::sync::OnceLock;

fn bar_style(unit: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{percent}}%) {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn new_bar(quiet: bool, len: u64) -> ProgressBar {
    if quiet { ProgressBar::hidden() } else { ProgressBar::new(len) }
}

/// Shows ingestion progress as elapsed minutes of the requested time span.
#[derive(Debug)]
pub(crate) struct IngestProgressBar {
    bar: OnceLock<(ProgressBar, DateTime<Utc>)>,
    quiet: bool,
}

impl IngestProgressBar {
    pub(crate) const fn new(quiet: bool) -> Self {
        Self {
            bar: OnceLock::new(),
            quiet,
        }
    }
}

impl IngestObserver for IngestProgressBar {
    fn on_start(&self, market: &Market, from: DateTime<Utc>, until: DateTime<Utc>) {
        let minutes = (until - from).num_minutes().max(0) as u64;
        let bar = new_bar(self.quiet, minutes);
        bar.set_style(bar_style("minutes"));
        bar.set_message(format!("{market} {} -> {}", from.date_naive(), until.date_naive()));
        let _ = self.bar.set((bar, from));
    }

    fn on_progress(&self, progress: &IngestProgress) {
        let Some((bar, from)) = self.bar.get() else {
            return;
        };
        bar.set_position((progress.position - *from).num_minutes().max(0) as u64);
        let window = progress
            .window
            .map(|w| format!(" window {}s", w.num_seconds()))
            .unwrap_or_default();
        bar.set_message(format!("{} trades{window}", progress.trades));
    }

    fn on_finish(&self, summary: &IngestSummary) {
        if let Some((bar, _)) = self.bar.get() {
            bar.finish_with_message(format!(
                "{} trades in {} batches ({} requests)",
                summary.trades, summary.batches, summary.requests
            ));
        }
    }
}

/// Shows aggregation progress as notional read between the resume point and
/// the latest stored trade.
#[derive(Debug)]
pub(crate) struct AggregateProgressBar {
    bar: OnceLock<(ProgressBar, Decimal)>,
    quiet: bool,
}

impl AggregateProgressBar {
    pub(crate) const fn new(quiet: bool) -> Self {
        Self {
            bar: OnceLock::new(),
            quiet,
        }
    }

    pub(crate) fn finish(&self, message: String) {
        if let Some((bar, _)) = self.bar.get() {
            bar.finish_with_message(message);
        }
    }
}

impl AggregateObserver for AggregateProgressBar {
    fn on_start(&self, head: Decimal, tail: Decimal) {
        let total = (tail - head).trunc().to_u64().unwrap_or(0);
        let bar = new_bar(self.quiet, total);
        bar.set_style(bar_style("notional"));
        let _ = self.bar.set((bar, head));
    }

    fn on_page(&self, cursor: Decimal, bars: usize) {
        if let Some((bar, head)) = self.bar.get() {
            bar.set_position((cursor - *head).trunc().to_u64().unwrap_or(0));
            if bars > 0 {
                bar.set_message(format!("+{bars} bars"));
            }
        }
    }
}
