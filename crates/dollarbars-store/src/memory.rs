//! In-process store.

use dollarbars_types::{BarSeries, Decimal, DollarBar, Market, Trade};
use std::sync::{Mutex, MutexGuard};

use crate::table::{Table, Tables, page_after};
use crate::{Result, StoreError, TradeStore};

/// Store that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Returns every trade stored for `market`, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn trades(&self, market: &Market) -> Result<Vec<Trade>> {
        let tables = self.lock()?;
        Ok(tables
            .trades
            .get(&market.trade_table())
            .map(|t| t.rows().to_vec())
            .unwrap_or_default())
    }

    /// Returns every bar stored for `series`, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn bars(&self, series: &BarSeries) -> Result<Vec<DollarBar>> {
        let tables = self.lock()?;
        Ok(tables
            .bars
            .get(&series.bar_table())
            .map(|t| t.rows().to_vec())
            .unwrap_or_default())
    }
}

impl TradeStore for MemoryStore {
    fn ensure_trade_table(&self, market: &Market) -> Result<()> {
        self.lock()?
            .trades
            .entry(market.trade_table())
            .or_insert_with(Table::new);
        Ok(())
    }

    fn ensure_bar_table(&self, series: &BarSeries) -> Result<()> {
        self.lock()?
            .bars
            .entry(series.bar_table())
            .or_insert_with(Table::new);
        Ok(())
    }

    fn get_latest_trade(&self, market: &Market) -> Result<Option<Trade>> {
        let tables = self.lock()?;
        Ok(tables
            .trades
            .get(&market.trade_table())
            .and_then(|t| t.rows().last().cloned()))
    }

    fn get_first_trade(&self, market: &Market) -> Result<Option<Trade>> {
        let tables = self.lock()?;
        Ok(tables
            .trades
            .get(&market.trade_table())
            .and_then(|t| t.rows().first().cloned()))
    }

    fn get_latest_bar(&self, series: &BarSeries) -> Result<Option<DollarBar>> {
        let tables = self.lock()?;
        Ok(tables
            .bars
            .get(&series.bar_table())
            .and_then(|t| t.rows().last().cloned()))
    }

    fn append_trades(&self, market: &Market, trades: &[Trade]) -> Result<()> {
        let name = market.trade_table();
        let mut tables = self.lock()?;
        let table = tables
            .trades
            .get_mut(&name)
            .ok_or_else(|| StoreError::MissingTable(name.clone()))?;
        table.check_append(&name, trades)?;
        table.extend(trades);
        Ok(())
    }

    fn append_bars(&self, series: &BarSeries, bars: &[DollarBar]) -> Result<()> {
        let name = series.bar_table();
        let mut tables = self.lock()?;
        let table = tables
            .bars
            .get_mut(&name)
            .ok_or_else(|| StoreError::MissingTable(name.clone()))?;
        table.check_append(&name, bars)?;
        table.extend(bars);
        Ok(())
    }

    fn query_trades_page(
        &self,
        market: &Market,
        after: Decimal,
        limit: usize,
    ) -> Result<Vec<Trade>> {
        let tables = self.lock()?;
        Ok(tables
            .trades
            .get(&market.trade_table())
            .map(|t| page_after(t, after, limit))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{market, trades};

    #[test]
    fn test_reads_on_missing_table_are_empty() {
        let store = MemoryStore::new();
        let market = market();
        assert!(store.get_latest_trade(&market).unwrap().is_none());
        assert!(store.get_first_trade(&market).unwrap().is_none());
        assert!(store.query_trades_page(&market, Decimal::ZERO, 10).unwrap().is_empty());
    }

    #[test]
    fn test_append_requires_table() {
        let store = MemoryStore::new();
        let err = store.append_trades(&market(), &trades(&[50])).unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(_)));
    }

    #[test]
    fn test_latest_and_first() {
        let store = MemoryStore::new();
        let market = market();
        store.ensure_trade_table(&market).unwrap();
        store.append_trades(&market, &trades(&[50, 70, 60])).unwrap();

        assert_eq!(store.get_first_trade(&market).unwrap().unwrap().id, "1");
        assert_eq!(store.get_latest_trade(&market).unwrap().unwrap().id, "3");
    }

    #[test]
    fn test_duplicate_key_rejects_whole_batch() {
        let store = MemoryStore::new();
        let market = market();
        store.ensure_trade_table(&market).unwrap();
        let batch = trades(&[50, 70]);
        store.append_trades(&market, &batch[..1]).unwrap();

        let err = store.append_trades(&market, &batch).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.trades(&market).unwrap().len(), 1);
    }

    #[test]
    fn test_query_trades_page_is_strictly_after() {
        let store = MemoryStore::new();
        let market = market();
        store.ensure_trade_table(&market).unwrap();
        // cumsums 50, 120, 180, 260, 340
        store.append_trades(&market, &trades(&[50, 70, 60, 80, 80])).unwrap();

        let page = store.query_trades_page(&market, Decimal::from(120), 2).unwrap();
        let sums: Vec<_> = page.iter().map(|t| t.notional_cumsum).collect();
        assert_eq!(sums, [Decimal::from(180), Decimal::from(260)]);

        let rest = store.query_trades_page(&market, Decimal::from(340), 10).unwrap();
        assert!(rest.is_empty());
    }
}
