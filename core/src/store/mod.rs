//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Metrics code receives records through `DisputeSource`; it never runs SQL.

use crate::{
    error::RecoveryResult,
    filter::DisputeFilter,
    record::DisputeRecord,
    source::DisputeSource,
};
use rusqlite::{params, Connection};

mod dispute;
mod report;

pub use report::ReportRunRow;

pub struct RecoveryStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl RecoveryStore {
    pub fn open(path: &str) -> RecoveryResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RecoveryResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> RecoveryResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RecoveryResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_disputes.sql"))?;
        Ok(())
    }

    // ── Filter options ─────────────────────────────────────────────

    pub fn dispute_count(&self) -> RecoveryResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM dispute", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Trimmed, distinct platform names.
    pub fn distinct_platforms(&self) -> RecoveryResult<Vec<String>> {
        self.distinct_column("SELECT DISTINCT TRIM(platform) FROM dispute ORDER BY 1")
    }

    /// Non-blank chain names.
    pub fn distinct_chains(&self) -> RecoveryResult<Vec<String>> {
        self.distinct_column(
            "SELECT DISTINCT TRIM(chain) FROM dispute
             WHERE chain IS NOT NULL AND TRIM(chain) != ''
             ORDER BY 1",
        )
    }

    fn distinct_column(&self, sql: &str) -> RecoveryResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    /// Latest dispute date on file, if any.
    pub fn latest_dispute_date(&self) -> RecoveryResult<Option<chrono::NaiveDate>> {
        let raw: Option<String> =
            self.conn
                .query_row("SELECT MAX(dispute_date) FROM dispute", [], |row| row.get(0))?;
        raw.map(|s| dispute::parse_date("latest", "dispute_date", &s))
            .transpose()
    }

    pub fn delete_all_disputes(&self) -> RecoveryResult<usize> {
        let n = self.conn.execute("DELETE FROM dispute", params![])?;
        Ok(n)
    }
}

impl DisputeSource for RecoveryStore {
    fn fetch_dispute_records(&self, filter: &DisputeFilter) -> RecoveryResult<Vec<DisputeRecord>> {
        filter.validate()?;
        let records = self.query_disputes(filter)?;
        log::debug!(
            "store: fetched {} disputes for {}..={}",
            records.len(),
            filter.date_range.start,
            filter.date_range.end
        );
        Ok(records)
    }
}
