//! Once-per-day attendance ledger.
//!
//! The recognition core only supplies identity matches; turning a
//! match into an attendance record is this caller-side policy. The
//! ledger enforces at most one record per (identity, calendar day)
//! with a single atomic get-or-create, so it holds no matter how many
//! frames re-recognize the same face within the day.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;

use crate::engine::Recognition;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub identity: String,
    pub day: NaiveDate,
    pub recorded_at: NaiveDateTime,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS attendance (
    id INTEGER PRIMARY KEY,
    identity TEXT NOT NULL,
    day TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE (identity, day)
)";

pub struct AttendanceLedger {
    conn: Connection,
}

impl AttendanceLedger {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }

    /// Get-or-create the record for (identity, day of `at`). Returns
    /// whether a NEW record was created; an existing record for the
    /// same identity and day is a no-op, not an error.
    pub fn mark_present(&self, identity: &str, at: NaiveDateTime) -> Result<bool, LedgerError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO attendance (identity, day, recorded_at) VALUES (?1, ?2, ?3)",
            params![identity, at.date(), at],
        )?;
        Ok(inserted == 1)
    }

    /// All records for one calendar day, in recording order.
    pub fn present_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT identity, day, recorded_at FROM attendance WHERE day = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![day], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Full attendance history for one identity, oldest first.
    pub fn history(&self, identity: &str) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT identity, day, recorded_at FROM attendance WHERE identity = ?1 ORDER BY day",
        )?;
        let rows = stmt.query_map(params![identity], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        identity: row.get(0)?,
        day: row.get(1)?,
        recorded_at: row.get(2)?,
    })
}

/// Apply the once-per-day policy to a batch of recognition results,
/// skipping Unknown faces. Returns the identities newly marked present
/// by this batch.
pub fn record_recognitions(
    ledger: &AttendanceLedger,
    results: &[Recognition],
    at: NaiveDateTime,
) -> Result<Vec<String>, LedgerError> {
    let mut newly_marked = Vec::new();
    for result in results {
        let Some(identity) = result.identity.as_deref() else {
            continue;
        };
        if ledger.mark_present(identity, at)? {
            tracing::info!(identity = %identity, day = %at.date(), "attendance recorded");
            newly_marked.push(identity.to_string());
        }
    }
    Ok(newly_marked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemark_core::Region;

    fn at(day: &str, time: &str) -> NaiveDateTime {
        format!("{day}T{time}").parse().unwrap()
    }

    fn recognition(identity: Option<&str>) -> Recognition {
        Recognition {
            identity: identity.map(str::to_owned),
            confidence: if identity.is_some() { 0.9 } else { 0.0 },
            region: Region::from_rect(0, 0, 100, 100),
        }
    }

    #[test]
    fn test_first_mark_creates_record() {
        let ledger = AttendanceLedger::open_in_memory().unwrap();
        assert!(ledger.mark_present("T001", at("2024-05-02", "08:30:00")).unwrap());
        let day = ledger.present_on("2024-05-02".parse().unwrap()).unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].identity, "T001");
    }

    #[test]
    fn test_repeat_marks_same_day_are_noops() {
        let ledger = AttendanceLedger::open_in_memory().unwrap();
        assert!(ledger.mark_present("T001", at("2024-05-02", "08:30:00")).unwrap());
        // the same face recognized over and over during the day
        for minute in 0..10 {
            let when = at("2024-05-02", &format!("09:{minute:02}:00"));
            assert!(!ledger.mark_present("T001", when).unwrap());
        }
        assert_eq!(ledger.present_on("2024-05-02".parse().unwrap()).unwrap().len(), 1);
        // original timestamp is kept
        assert_eq!(
            ledger.history("T001").unwrap()[0].recorded_at,
            at("2024-05-02", "08:30:00")
        );
    }

    #[test]
    fn test_new_day_creates_new_record() {
        let ledger = AttendanceLedger::open_in_memory().unwrap();
        assert!(ledger.mark_present("T001", at("2024-05-02", "08:30:00")).unwrap());
        assert!(ledger.mark_present("T001", at("2024-05-03", "08:30:00")).unwrap());
        assert_eq!(ledger.history("T001").unwrap().len(), 2);
    }

    #[test]
    fn test_identities_are_independent() {
        let ledger = AttendanceLedger::open_in_memory().unwrap();
        assert!(ledger.mark_present("T001", at("2024-05-02", "08:30:00")).unwrap());
        assert!(ledger.mark_present("T002", at("2024-05-02", "08:31:00")).unwrap());
        let day = ledger.present_on("2024-05-02".parse().unwrap()).unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].identity, "T001");
        assert_eq!(day[1].identity, "T002");
    }

    #[test]
    fn test_record_recognitions_skips_unknown() {
        let ledger = AttendanceLedger::open_in_memory().unwrap();
        let results = vec![
            recognition(Some("T001")),
            recognition(None),
            recognition(Some("T002")),
        ];
        let marked =
            record_recognitions(&ledger, &results, at("2024-05-02", "08:30:00")).unwrap();
        assert_eq!(marked, vec!["T001".to_string(), "T002".to_string()]);
    }

    #[test]
    fn test_record_recognitions_idempotent_across_batches() {
        let ledger = AttendanceLedger::open_in_memory().unwrap();
        let results = vec![recognition(Some("T001"))];
        let first =
            record_recognitions(&ledger, &results, at("2024-05-02", "08:30:00")).unwrap();
        let second =
            record_recognitions(&ledger, &results, at("2024-05-02", "11:45:00")).unwrap();
        assert_eq!(first, vec!["T001".to_string()]);
        assert!(second.is_empty());
    }
}
