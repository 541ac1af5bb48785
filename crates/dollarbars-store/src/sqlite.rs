//! SQLite store.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use dollarbars_types::{BarSeries, Decimal, DollarBar, Market, Side, Trade};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::{Result, StoreError, TradeStore};

/// Database file created inside a data directory.
pub const DATABASE_FILE: &str = "dollarbars.sqlite3";

const TRADE_COLUMNS: &str = "timestamp, id, side, is_liquidation, price, amount, notional, \
     notional_cumsum, buy_notional_cumsum, sell_notional_cumsum";

const BAR_COLUMNS: &str = "timestamp, timestamp_from, trade_id, trade_id_from, open, high, low, \
     close, amount, notional_volume, buy_notional_volume, sell_notional_volume, \
     liquidation_buy_notional_volume, liquidation_sell_notional_volume, notional_cumsum, \
     buy_notional_cumsum, sell_notional_cumsum";

/// Store with one SQLite table per logical table, all in one database file.
///
/// Every batch is inserted in a single transaction, so a batch is either
/// fully visible or not at all, even if the process dies mid-write. Decimals
/// are stored as text and timestamps as epoch microseconds.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, creating its parent
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(&path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened database");

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Opens the database file inside the data directory `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the database cannot be opened.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref().join(DATABASE_FILE))
    }

    /// Returns the default data directory.
    ///
    /// - Linux: `~/.local/share/dollarbars/`
    /// - macOS: `~/Library/Application Support/dollarbars/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\dollarbars\`
    ///
    /// Falls back to `~/.dollarbars/`.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        ProjectDirs::from("", "", "dollarbars").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Opens the database in the default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the database cannot be opened.
    pub fn with_default_path() -> Result<Self> {
        Self::in_dir(Self::default_dir())
    }

    /// Returns the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Fallback for determining home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".dollarbars")
}

fn quoted(table: &str) -> String {
    format!("\"{}\"", table.replace('"', "\"\""))
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )?)
}

/// Width of the integer part of a [`cumsum_key`].
const KEY_INT_DIGITS: usize = 29;
/// Width of the fractional part of a [`cumsum_key`].
const KEY_FRAC_DIGITS: usize = 28;

/// Encodes a non-negative decimal as fixed-width text whose byte order is
/// its numeric order, so SQLite can index and compare cumulative sums.
///
/// Returns `None` for negative values.
pub(crate) fn cumsum_key(value: Decimal) -> Option<String> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let text = if value.is_zero() {
        String::from("0")
    } else {
        value.normalize().to_string()
    };
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    Some(format!(
        "{int:0>KEY_INT_DIGITS$}.{frac:0<KEY_FRAC_DIGITS$}"
    ))
}

fn decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp {micros} out of range").into(),
        )
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let side: String = row.get(2)?;
    Ok(Trade {
        timestamp: timestamp(row, 0)?,
        id: row.get(1)?,
        side: side
            .parse::<Side>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        is_liquidation: row.get(3)?,
        price: decimal(row, 4)?,
        amount: decimal(row, 5)?,
        notional: decimal(row, 6)?,
        notional_cumsum: decimal(row, 7)?,
        buy_notional_cumsum: decimal(row, 8)?,
        sell_notional_cumsum: decimal(row, 9)?,
    })
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<DollarBar> {
    Ok(DollarBar {
        timestamp: timestamp(row, 0)?,
        timestamp_from: timestamp(row, 1)?,
        trade_id: row.get(2)?,
        trade_id_from: row.get(3)?,
        open: decimal(row, 4)?,
        high: decimal(row, 5)?,
        low: decimal(row, 6)?,
        close: decimal(row, 7)?,
        amount: decimal(row, 8)?,
        notional_volume: decimal(row, 9)?,
        buy_notional_volume: decimal(row, 10)?,
        sell_notional_volume: decimal(row, 11)?,
        liquidation_buy_notional_volume: decimal(row, 12)?,
        liquidation_sell_notional_volume: decimal(row, 13)?,
        notional_cumsum: decimal(row, 14)?,
        buy_notional_cumsum: decimal(row, 15)?,
        sell_notional_cumsum: decimal(row, 16)?,
    })
}

/// Maps a unique-constraint failure to [`StoreError::DuplicateKey`].
fn insert_error(err: rusqlite::Error, table: &str, key: String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::DuplicateKey {
                table: table.to_string(),
                key,
            }
        }
        other => other.into(),
    }
}

fn begin_append<'c>(conn: &'c mut Connection, table: &str) -> Result<Transaction<'c>> {
    let tx = conn.transaction()?;
    if !table_exists(&tx, table)? {
        return Err(StoreError::MissingTable(table.to_string()));
    }
    Ok(tx)
}

fn select_one<T>(
    conn: &Connection,
    table: &str,
    sql: &str,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }
    Ok(conn.query_row(sql, [], f).optional()?)
}

impl TradeStore for SqliteStore {
    fn ensure_trade_table(&self, market: &Market) -> Result<()> {
        let name = market.trade_table();
        let table = quoted(&name);
        let index = quoted(&format!("{name}_cumsum_key"));
        self.lock()?.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                id TEXT NOT NULL,
                side TEXT NOT NULL,
                is_liquidation INTEGER NOT NULL,
                price TEXT NOT NULL,
                amount TEXT NOT NULL,
                notional TEXT NOT NULL,
                notional_cumsum TEXT NOT NULL,
                buy_notional_cumsum TEXT NOT NULL,
                sell_notional_cumsum TEXT NOT NULL,
                cumsum_key TEXT NOT NULL,
                UNIQUE (timestamp, id)
            );
            CREATE INDEX IF NOT EXISTS {index} ON {table} (cumsum_key);"
        ))?;
        debug!(table = %name, "ensured trade table");
        Ok(())
    }

    fn ensure_bar_table(&self, series: &BarSeries) -> Result<()> {
        let name = series.bar_table();
        let table = quoted(&name);
        self.lock()?.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                timestamp_from INTEGER NOT NULL,
                trade_id TEXT NOT NULL,
                trade_id_from TEXT NOT NULL,
                open TEXT NOT NULL,
                high TEXT NOT NULL,
                low TEXT NOT NULL,
                close TEXT NOT NULL,
                amount TEXT NOT NULL,
                notional_volume TEXT NOT NULL,
                buy_notional_volume TEXT NOT NULL,
                sell_notional_volume TEXT NOT NULL,
                liquidation_buy_notional_volume TEXT NOT NULL,
                liquidation_sell_notional_volume TEXT NOT NULL,
                notional_cumsum TEXT NOT NULL,
                buy_notional_cumsum TEXT NOT NULL,
                sell_notional_cumsum TEXT NOT NULL,
                UNIQUE (timestamp, trade_id)
            );"
        ))?;
        debug!(table = %name, "ensured bar table");
        Ok(())
    }

    fn get_latest_trade(&self, market: &Market) -> Result<Option<Trade>> {
        let name = market.trade_table();
        let sql = format!(
            "SELECT {TRADE_COLUMNS} FROM {} ORDER BY seq DESC LIMIT 1",
            quoted(&name)
        );
        select_one(&*self.lock()?, &name, &sql, trade_from_row)
    }

    fn get_first_trade(&self, market: &Market) -> Result<Option<Trade>> {
        let name = market.trade_table();
        let sql = format!(
            "SELECT {TRADE_COLUMNS} FROM {} ORDER BY seq ASC LIMIT 1",
            quoted(&name)
        );
        select_one(&*self.lock()?, &name, &sql, trade_from_row)
    }

    fn get_latest_bar(&self, series: &BarSeries) -> Result<Option<DollarBar>> {
        let name = series.bar_table();
        let sql = format!(
            "SELECT {BAR_COLUMNS} FROM {} ORDER BY seq DESC LIMIT 1",
            quoted(&name)
        );
        select_one(&*self.lock()?, &name, &sql, bar_from_row)
    }

    fn append_trades(&self, market: &Market, trades: &[Trade]) -> Result<()> {
        let name = market.trade_table();
        let mut conn = self.lock()?;
        let tx = begin_append(&mut conn, &name)?;
        {
            let mut insert = tx.prepare_cached(&format!(
                "INSERT INTO {} ({TRADE_COLUMNS}, cumsum_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                quoted(&name)
            ))?;
            for trade in trades {
                let key = cumsum_key(trade.notional_cumsum).ok_or_else(|| {
                    StoreError::InvalidValue {
                        table: name.clone(),
                        column: "notional_cumsum",
                        value: trade.notional_cumsum.to_string(),
                    }
                })?;
                insert
                    .execute(params![
                        trade.timestamp.timestamp_micros(),
                        trade.id,
                        trade.side.as_str(),
                        trade.is_liquidation,
                        trade.price.to_string(),
                        trade.amount.to_string(),
                        trade.notional.to_string(),
                        trade.notional_cumsum.to_string(),
                        trade.buy_notional_cumsum.to_string(),
                        trade.sell_notional_cumsum.to_string(),
                        key,
                    ])
                    .map_err(|e| {
                        insert_error(e, &name, format!("({}, {})", trade.timestamp.to_rfc3339(), trade.id))
                    })?;
            }
        }
        tx.commit()?;
        if !trades.is_empty() {
            info!(table = %name, rows = trades.len(), "committed trades");
        }
        Ok(())
    }

    fn append_bars(&self, series: &BarSeries, bars: &[DollarBar]) -> Result<()> {
        let name = series.bar_table();
        let mut conn = self.lock()?;
        let tx = begin_append(&mut conn, &name)?;
        {
            let mut insert = tx.prepare_cached(&format!(
                "INSERT INTO {} ({BAR_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                quoted(&name)
            ))?;
            for bar in bars {
                insert
                    .execute(params![
                        bar.timestamp.timestamp_micros(),
                        bar.timestamp_from.timestamp_micros(),
                        bar.trade_id,
                        bar.trade_id_from,
                        bar.open.to_string(),
                        bar.high.to_string(),
                        bar.low.to_string(),
                        bar.close.to_string(),
                        bar.amount.to_string(),
                        bar.notional_volume.to_string(),
                        bar.buy_notional_volume.to_string(),
                        bar.sell_notional_volume.to_string(),
                        bar.liquidation_buy_notional_volume.to_string(),
                        bar.liquidation_sell_notional_volume.to_string(),
                        bar.notional_cumsum.to_string(),
                        bar.buy_notional_cumsum.to_string(),
                        bar.sell_notional_cumsum.to_string(),
                    ])
                    .map_err(|e| {
                        insert_error(e, &name, format!("({}, {})", bar.timestamp.to_rfc3339(), bar.trade_id))
                    })?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query_trades_page(
        &self,
        market: &Market,
        after: Decimal,
        limit: usize,
    ) -> Result<Vec<Trade>> {
        let name = market.trade_table();
        let conn = self.lock()?;
        if !table_exists(&conn, &name)? {
            return Ok(Vec::new());
        }
        // Every stored key sorts after the empty string.
        let after_key = cumsum_key(after).unwrap_or_default();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut select = conn.prepare_cached(&format!(
            "SELECT {TRADE_COLUMNS} FROM {} WHERE cumsum_key > ?1
             ORDER BY cumsum_key, seq LIMIT ?2",
            quoted(&name)
        ))?;
        let trades = select
            .query_map(params![after_key, limit], trade_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trades)
    }
}
