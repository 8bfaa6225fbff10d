//! Audit trail of remark status marks, kept in a local SQLite file.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::excel::StatusChange;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// One recorded status mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: i64,
    pub sheet: String,
    /// 1-based spreadsheet row
    pub row: u32,
    /// Column letter the mark went to
    pub column: String,
    pub value: String,
    pub previous: String,
    pub updated_by: String,
    /// Unix milliseconds
    pub updated_at: i64,
}

pub struct StatusHistory {
    conn: Connection,
}

impl StatusHistory {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        StatusHistory::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        StatusHistory::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS remarks_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sheet TEXT NOT NULL,
                excel_row INTEGER NOT NULL,
                column_letter TEXT NOT NULL,
                value TEXT NOT NULL,
                previous TEXT NOT NULL DEFAULT '',
                updated_by TEXT NOT NULL DEFAULT '',
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_remarks_history_row ON remarks_history(sheet, excel_row)",
            [],
        )?;

        Ok(StatusHistory { conn })
    }

    /// Append a change made by `user`
    pub fn record(&self, change: &StatusChange, user: &str) -> Result<StatusRecord, HistoryError> {
        let now = chrono::Utc::now().timestamp_millis();

        self.conn.execute(
            "INSERT INTO remarks_history (sheet, excel_row, column_letter, value, previous, updated_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                change.sheet,
                change.row,
                change.column.letter(),
                change.value,
                change.previous,
                user,
                now
            ],
        )?;

        Ok(StatusRecord {
            id: self.conn.last_insert_rowid(),
            sheet: change.sheet.clone(),
            row: change.row,
            column: change.column.letter().to_string(),
            value: change.value.clone(),
            previous: change.previous.clone(),
            updated_by: user.to_string(),
            updated_at: now,
        })
    }

    /// Changes to one sheet row, oldest first
    pub fn for_row(&self, sheet: &str, row: u32) -> Result<Vec<StatusRecord>, HistoryError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sheet, excel_row, column_letter, value, previous, updated_by, updated_at
             FROM remarks_history
             WHERE sheet = ?1 AND excel_row = ?2
             ORDER BY id ASC",
        )?;

        let records = stmt
            .query_map(rusqlite::params![sheet, row], |r| {
                Ok(StatusRecord {
                    id: r.get(0)?,
                    sheet: r.get(1)?,
                    row: r.get(2)?,
                    column: r.get(3)?,
                    value: r.get(4)?,
                    previous: r.get(5)?,
                    updated_by: r.get(6)?,
                    updated_at: r.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::StatusColumn;

    fn change(row: u32, column: StatusColumn, value: &str, previous: &str) -> StatusChange {
        StatusChange {
            sheet: "2025".into(),
            row,
            column,
            value: value.into(),
            previous: previous.into(),
        }
    }

    #[test]
    fn test_records_and_lists_by_row() {
        let history = StatusHistory::open_in_memory().unwrap();

        history.record(&change(5, StatusColumn::Pb, "нет", ""), "ivanov").unwrap();
        history.record(&change(6, StatusColumn::Pb, "да", ""), "ivanov").unwrap();
        let last = history.record(&change(5, StatusColumn::Eom, "да", "нет"), "petrov").unwrap();

        let rows = history.for_row("2025", 5).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].column, "Q");
        assert_eq!(rows[1].column, "AD");
        assert_eq!(rows[1].previous, "нет");
        assert_eq!(rows[1].updated_by, "petrov");
        assert_eq!(rows[1], last);

        assert!(history.for_row("2024", 5).unwrap().is_empty());
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        StatusHistory::open(&path)
            .unwrap()
            .record(&change(3, StatusColumn::Ar, "да", ""), "")
            .unwrap();

        let reopened = StatusHistory::open(&path).unwrap();
        let rows = reopened.for_row("2025", 3).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].column, "Y");
    }
}
