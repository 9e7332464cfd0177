use super::RecoveryStore;
use crate::error::RecoveryResult;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRunRow {
    pub run_id: String,
    pub as_of: String,
    pub period_start: String,
    pub period_end: String,
    pub report_json: String,
}

impl RecoveryStore {
    pub fn insert_report_run(&self, row: &ReportRunRow) -> RecoveryResult<()> {
        self.conn.execute(
            "INSERT INTO report_run (run_id, as_of, period_start, period_end, report_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.run_id,
                row.as_of,
                row.period_start,
                row.period_end,
                row.report_json,
            ],
        )?;
        Ok(())
    }

    pub fn get_report_run(&self, run_id: &str) -> RecoveryResult<Option<ReportRunRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, as_of, period_start, period_end, report_json
                 FROM report_run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok(ReportRunRow {
                        run_id: row.get(0)?,
                        as_of: row.get(1)?,
                        period_start: row.get(2)?,
                        period_end: row.get(3)?,
                        report_json: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn report_run_count(&self) -> RecoveryResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM report_run", [], |row| row.get(0))?;
        Ok(n)
    }
}
