//! Storage layer for the rain gauge daemon.
//!
//! Provides persistence for finished minutes using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The daemon opens two connections to the same file:
//! - one owned by the collector thread, the only writer
//! - one behind a `Mutex` shared by request handlers for reads
//!
//! The file is put in WAL mode so readers never block the writer and vice versa.
//!
//! # Schema
//!
//! A single `rain` table holds one row per finished minute that saw at least one
//! tip. `ts` is the minute start in seconds since the Unix epoch (UTC) and is the
//! primary key, so a clock that rolls back produces a constraint error instead of
//! a second row for the same minute. Rows are never updated or deleted.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rg_core::{ArchiveWindow, HourTotal, RainRecord, RainStore};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened database");
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- One row per finished minute with rain
            -- ts: minute start, seconds since the Unix epoch
            -- amount: raw tip count
            -- divider: tips per inch in effect when recorded
            CREATE TABLE IF NOT EXISTS rain (
                ts INTEGER PRIMARY KEY NOT NULL,
                amount INTEGER NOT NULL,
                divider INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a finished minute. A duplicate timestamp is an error.
    pub fn insert_rain(&mut self, record: &RainRecord) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO rain (ts, amount, divider) VALUES (?, ?, ?)",
            params![record.timestamp, record.amount, record.divider],
        )?;
        Ok(())
    }

    /// Lists rows with `ts > after`, oldest first.
    pub fn rain_since(&self, after: i64) -> Result<Vec<RainRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT ts, amount, divider
            FROM rain
            WHERE ts > ?
            ORDER BY ts ASC
            ",
        )?;
        let rows = stmt.query_map([after], |row| {
            Ok(RainRecord {
                timestamp: row.get(0)?,
                amount: row.get(1)?,
                divider: row.get(2)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Sums rows with `ts > after` by hour-of-day (UTC).
    ///
    /// Hours come from `strftime`, so rows before the epoch still land in
    /// `0..24`.
    pub fn hourly_totals_since(&self, after: i64) -> Result<Vec<HourTotal>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT CAST(strftime('%H', ts, 'unixepoch') AS INTEGER) AS hour,
                SUM(amount), MIN(divider), MAX(divider)
            FROM rain
            WHERE ts > ?
            GROUP BY hour
            ORDER BY hour ASC
            ",
        )?;
        let rows = stmt.query_map([after], |row| {
            let hour: i64 = row.get(0)?;
            Ok(HourTotal {
                hour: usize::try_from(hour).unwrap_or_default(),
                amount: row.get(1)?,
                min_divider: row.get(2)?,
                max_divider: row.get(3)?,
            })
        })?;
        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    /// Returns the most recent row, if any rain has been recorded.
    pub fn last_rain(&self) -> Result<Option<RainRecord>, DbError> {
        let record = self
            .conn
            .query_row(
                "SELECT ts, amount, divider FROM rain ORDER BY ts DESC LIMIT 1",
                [],
                |row| {
                    Ok(RainRecord {
                        timestamp: row.get(0)?,
                        amount: row.get(1)?,
                        divider: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Counts stored rows.
    pub fn count_rain(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM rain", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Sums rows inside `window`, keyed by the window's grouping.
    ///
    /// Keys come from SQLite's `strftime` in UTC, so day/hour keys are
    /// zero-padded (`0510`) and day-of-year keys are three digits (`032`).
    pub fn archive(&self, window: &ArchiveWindow) -> Result<BTreeMap<String, i64>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT strftime(?1, ts, 'unixepoch') AS bucket, SUM(amount)
            FROM rain
            WHERE ts >= ?2 AND ts < ?3
            GROUP BY bucket
            ",
        )?;
        let rows = stmt.query_map(
            params![window.grouping.strftime_format(), window.start, window.end],
            |row| {
                let bucket: String = row.get(0)?;
                let amount: i64 = row.get(1)?;
                Ok((bucket, amount))
            },
        )?;
        let mut data = BTreeMap::new();
        for row in rows {
            let (bucket, amount) = row?;
            data.insert(bucket, amount);
        }
        Ok(data)
    }
}

impl RainStore for Database {
    type Error = DbError;

    fn insert_rain(&mut self, record: &RainRecord) -> Result<(), Self::Error> {
        Self::insert_rain(self, record)
    }

    fn rain_since(&self, after: i64) -> Result<Vec<RainRecord>, Self::Error> {
        Self::rain_since(self, after)
    }

    fn hourly_totals_since(&self, after: i64) -> Result<Vec<HourTotal>, Self::Error> {
        Self::hourly_totals_since(self, after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};
    use rg_core::ArchivePeriod;

    fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .unwrap()
            .timestamp()
    }

    fn record(timestamp: i64, amount: i64) -> RainRecord {
        RainRecord {
            timestamp,
            amount,
            divider: 1_000,
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get(1))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(db.count_rain().unwrap(), 0);
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "rain"),
            ["ts", "amount", "divider"]
        );
    }

    #[test]
    fn open_file_uses_wal_and_reopens() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rg11.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_rain(&record(120, 2)).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let mode: String = db
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(db.rain_since(0).unwrap(), [record(120, 2)]);
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_rain(&record(600, 1)).unwrap();

        let err = db.insert_rain(&record(600, 4)).unwrap_err();

        assert!(matches!(err, DbError::Sqlite(_)));
        assert_eq!(db.rain_since(0).unwrap(), [record(600, 1)]);
    }

    #[test]
    fn rain_since_is_exclusive_and_ordered() {
        let mut db = Database::open_in_memory().unwrap();
        for (timestamp, amount) in [(300, 3), (60, 1), (180, 2)] {
            db.insert_rain(&record(timestamp, amount)).unwrap();
        }

        let rows = db.rain_since(60).unwrap();

        assert_eq!(rows, [record(180, 2), record(300, 3)]);
    }

    #[test]
    fn hourly_totals_group_by_hour_of_day() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_rain(&record(ts(2025, 3, 4, 23, 10), 1)).unwrap();
        db.insert_rain(&record(ts(2025, 3, 5, 10, 1), 2)).unwrap();
        db.insert_rain(&record(ts(2025, 3, 5, 10, 59), 3)).unwrap();
        db.insert_rain(&RainRecord {
            timestamp: ts(2025, 3, 5, 11, 0),
            amount: 4,
            divider: 100,
        })
        .unwrap();

        let totals = db.hourly_totals_since(ts(2025, 3, 4, 12, 0)).unwrap();

        let summary: Vec<(usize, i64)> = totals.iter().map(|t| (t.hour, t.amount)).collect();
        assert_eq!(summary, [(10, 5), (11, 4), (23, 1)]);
        let mixed: HashSet<usize> = totals
            .iter()
            .filter(|t| t.mixes_divider(1_000))
            .map(|t| t.hour)
            .collect();
        assert_eq!(mixed, HashSet::from([11]));
    }

    #[test]
    fn hourly_totals_before_epoch_stay_in_day_range() {
        let mut db = Database::open_in_memory().unwrap();
        // 1969-12-31T23:00:00Z and 1969-12-31T01:30:00Z
        db.insert_rain(&record(-3_600, 2)).unwrap();
        db.insert_rain(&record(-81_000, 1)).unwrap();

        let totals = db.hourly_totals_since(-86_400).unwrap();

        let summary: Vec<(usize, i64)> = totals.iter().map(|t| (t.hour, t.amount)).collect();
        assert_eq!(summary, [(1, 1), (23, 2)]);
    }

    #[test]
    fn last_rain_returns_latest_row() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.last_rain().unwrap(), None);

        db.insert_rain(&record(240, 1)).unwrap();
        db.insert_rain(&record(120, 5)).unwrap();

        assert_eq!(db.last_rain().unwrap(), Some(record(240, 1)));
        assert_eq!(db.count_rain().unwrap(), 2);
    }

    #[test]
    fn archive_this_month_keys_by_day_and_hour() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_rain(&record(ts(2025, 3, 5, 10, 0), 1)).unwrap();
        db.insert_rain(&record(ts(2025, 3, 5, 10, 30), 2)).unwrap();
        db.insert_rain(&record(ts(2025, 3, 5, 11, 45), 2)).unwrap();
        // Outside the window.
        db.insert_rain(&record(ts(2025, 2, 28, 23, 59), 9)).unwrap();
        db.insert_rain(&record(ts(2025, 4, 1, 0, 0), 9)).unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap();
        let window = ArchivePeriod::ThisMonth.window(now).unwrap();
        let data = db.archive(&window).unwrap();

        assert_eq!(
            data,
            BTreeMap::from([("0510".to_string(), 3), ("0511".to_string(), 2)])
        );
    }

    #[test]
    fn archive_last_month() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_rain(&record(ts(2025, 2, 28, 23, 59), 9)).unwrap();
        db.insert_rain(&record(ts(2025, 3, 5, 10, 0), 1)).unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap();
        let window = ArchivePeriod::LastMonth.window(now).unwrap();

        assert_eq!(
            db.archive(&window).unwrap(),
            BTreeMap::from([("2823".to_string(), 9)])
        );
    }

    #[test]
    fn archive_this_year_keys_by_day_of_year() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_rain(&record(ts(2025, 1, 1, 0, 5), 1)).unwrap();
        db.insert_rain(&record(ts(2025, 2, 1, 6, 0), 2)).unwrap();
        db.insert_rain(&record(ts(2025, 2, 1, 18, 0), 3)).unwrap();
        db.insert_rain(&record(ts(2024, 12, 31, 23, 0), 9)).unwrap();

        let now = Utc.with_ymd_and_hms(2025, 7, 4, 12, 0, 0).unwrap();
        let window = ArchivePeriod::ThisYear.window(now).unwrap();

        assert_eq!(
            db.archive(&window).unwrap(),
            BTreeMap::from([("001".to_string(), 1), ("032".to_string(), 5)])
        );
    }

    #[test]
    fn database_is_a_collector_store() {
        fn assert_store<S: RainStore>(_: &S) {}
        let db = Database::open_in_memory().unwrap();
        assert_store(&db);
    }
}
