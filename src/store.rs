//! SQLite persistence for scored transactions.
//!
//! Only this module talks to the database. Identity (row id) and the
//! server timestamp are assigned here, never by the scoring core.

use crate::error::{StoreError, StoreResult};
use crate::types::verdict::ScoredTransaction;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const RECORD_COLUMNS: &str = "id, status, amount, score, time, step, type, \
     oldbalanceOrg, newbalanceOrig, oldbalanceDest, newbalanceDest";

/// A persisted transaction, as served by the history endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub status: String,
    pub amount: f64,
    pub score: Option<f64>,
    /// Unix milliseconds
    pub time: i64,
    pub step: i64,
    #[serde(rename = "type")]
    pub raw_type: Option<String>,
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
}

impl TransactionRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            amount: row.get(2)?,
            score: row.get(3)?,
            time: row.get(4)?,
            step: row.get(5)?,
            raw_type: row.get(6)?,
            old_balance_org: row.get(7)?,
            new_balance_orig: row.get(8)?,
            old_balance_dest: row.get(9)?,
            new_balance_dest: row.get(10)?,
        })
    }
}

/// Condensed view of a suspicious transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub id: i64,
    pub status: String,
    pub amount: f64,
    pub score: Option<f64>,
    pub time: i64,
    #[serde(rename = "type")]
    pub raw_type: Option<String>,
}

pub struct TransactionStore {
    conn: Mutex<Connection>,
}

impl TransactionStore {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files; :memory: ignores it.
        match conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        }) {
            Ok(mode) => debug!(path = %path, journal_mode = %mode, "Database opened"),
            Err(e) => warn!(path = %path, error = %e, "Could not enable WAL journal mode"),
        }
        Self::with_connection(conn)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("../migrations/001_transactions.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Persist a scored transaction and return its new id
    pub fn insert(&self, scored: &ScoredTransaction, time_ms: i64) -> StoreResult<i64> {
        let tx = &scored.transaction;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transactions \
             (status, amount, score, time, step, type, \
              oldbalanceOrg, newbalanceOrig, oldbalanceDest, newbalanceDest) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                scored.verdict.status.as_str(),
                tx.amount,
                scored.verdict.anomaly_score,
                time_ms,
                tx.step_as_int(),
                tx.raw_type,
                tx.old_balance_org,
                tx.new_balance_orig,
                tx.old_balance_dest,
                tx.new_balance_dest,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All records, newest first
    pub fn history(&self) -> StoreResult<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM transactions ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map([], TransactionRecord::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Suspicious records, newest first
    pub fn alerts(&self) -> StoreResult<Vec<AlertRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, status, amount, score, time, type FROM transactions \
             WHERE status = 'Suspicious' ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AlertRecord {
                id: row.get(0)?,
                status: row.get(1)?,
                amount: row.get(2)?,
                score: row.get(3)?,
                time: row.get(4)?,
                raw_type: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent record, if any
    pub fn latest(&self) -> StoreResult<Option<TransactionRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM transactions ORDER BY id DESC LIMIT 1"),
                [],
                TransactionRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Delete every record; returns how many were removed
    pub fn clear(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM transactions", [])?)
    }
}
