//! In-memory table with a unique `(timestamp, id)` key.

use chrono::{DateTime, Utc};
use dollarbars_types::{Decimal, DollarBar, Trade};
use std::collections::{HashMap, HashSet};

use crate::{Result, StoreError};

pub(crate) type RowKey = (DateTime<Utc>, String);

/// A row type that can live in a table.
pub(crate) trait Row: Clone {
    fn row_key(&self) -> RowKey;
}

impl Row for Trade {
    fn row_key(&self) -> RowKey {
        (self.timestamp, self.id.clone())
    }
}

impl Row for DollarBar {
    fn row_key(&self) -> RowKey {
        (self.timestamp, self.trade_id.clone())
    }
}

#[derive(Debug)]
pub(crate) struct Table<R> {
    rows: Vec<R>,
    keys: HashSet<RowKey>,
}

impl<R: Row> Table<R> {
    pub(crate) fn new() -> Self {
        Self {
            rows: Vec::new(),
            keys: HashSet::new(),
        }
    }

    pub(crate) fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Fails if any row of `batch` collides with a stored row or another batch row.
    pub(crate) fn check_append(&self, name: &str, batch: &[R]) -> Result<()> {
        let mut seen = HashSet::with_capacity(batch.len());
        for row in batch {
            let key = row.row_key();
            if self.keys.contains(&key) || !seen.insert(key.clone()) {
                return Err(StoreError::DuplicateKey {
                    table: name.to_string(),
                    key: format!("({}, {})", key.0.to_rfc3339(), key.1),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn extend(&mut self, batch: &[R]) {
        self.keys.extend(batch.iter().map(Row::row_key));
        self.rows.extend_from_slice(batch);
    }
}

/// Trade and bar tables keyed by table name.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) trades: HashMap<String, Table<Trade>>,
    pub(crate) bars: HashMap<String, Table<DollarBar>>,
}

/// Rows of `table` whose notional cumsum is strictly greater than `after`.
///
/// Rows are stored in ascending cumsum order, so the page is a contiguous slice.
pub(crate) fn page_after(table: &Table<Trade>, after: Decimal, limit: usize) -> Vec<Trade> {
    let rows = table.rows();
    let start = rows.partition_point(|t| t.notional_cumsum <= after);
    rows[start..].iter().take(limit).cloned().collect()
}
