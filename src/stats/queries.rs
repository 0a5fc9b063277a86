//! Progress query functions
//!
//! Read-side of the progress store: session history, progress buckets,
//! summaries and settings.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use super::db::{optional_timestamp_column, parse_column, timestamp_column, ProgressDb};
use super::models::{OperationProgress, PracticeSessionRecord, ProgressFilter, ProgressSummary};
use crate::domain::{Difficulty, Operation, UserSettings};

const SESSION_COLUMNS: &str = "session_id, mode, operation, difficulty, problems_solved, \
     correct_answers, session_time, accuracy, avg_time_per_problem, completed_at";

const PROGRESS_COLUMNS: &str = "operation, difficulty, problems_solved, correct_answers, \
     total_time, best_time, current_streak, last_practiced, created_at, updated_at";

/// Query interface for practice progress
pub struct ProgressQuery {
    db: ProgressDb,
}

impl ProgressQuery {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    /// Sessions matching `filter`, newest first
    pub fn sessions(&self, filter: &ProgressFilter, now: DateTime<Utc>) -> Result<Vec<PracticeSessionRecord>> {
        let conn = self.db.conn();
        Self::load_sessions(&conn, filter, now, None)
    }

    /// The `limit` most recent sessions
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<PracticeSessionRecord>> {
        let conn = self.db.conn();
        Self::load_sessions(&conn, &ProgressFilter::default(), Utc::now(), Some(limit))
    }

    /// Progress buckets, optionally narrowed to one operation and/or difficulty
    pub fn progress(
        &self,
        operation: Option<Operation>,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<OperationProgress>> {
        let conn = self.db.conn();
        let mut buckets = Self::load_progress(&conn)?;
        buckets.retain(|b| {
            operation.is_none_or(|op| op == b.operation)
                && difficulty.is_none_or(|d| d == b.difficulty)
        });
        Ok(buckets)
    }

    /// A single bucket, if it has ever been practiced
    pub fn bucket(&self, operation: Operation, difficulty: Difficulty) -> Result<Option<OperationProgress>> {
        let conn = self.db.conn();
        Self::load_bucket(&conn, operation, difficulty)
    }

    /// Aggregate totals over the sessions matching `filter`
    pub fn summary(&self, filter: &ProgressFilter, now: DateTime<Utc>) -> Result<ProgressSummary> {
        let sessions = self.sessions(filter, now)?;
        Ok(ProgressSummary::from_sessions(&sessions))
    }

    pub fn settings(&self) -> Result<UserSettings> {
        let conn = self.db.conn();
        Self::load_settings(&conn)
    }

    // ========================================
    // CONNECTION-LEVEL HELPERS
    // ========================================

    pub(crate) fn load_sessions(
        conn: &Connection,
        filter: &ProgressFilter,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<PracticeSessionRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(op) = filter.operation {
            clauses.push("operation = ?");
            values.push(Value::Text(op.as_str().to_string()));
        }
        if let Some(difficulty) = filter.difficulty {
            clauses.push("difficulty = ?");
            values.push(Value::Text(difficulty.as_str().to_string()));
        }
        if let Some(mode) = filter.mode {
            clauses.push("mode = ?");
            values.push(Value::Text(mode.as_str().to_string()));
        }
        if let Some(cutoff) = filter.window.cutoff(now) {
            clauses.push("completed_at >= ?");
            values.push(Value::Integer(cutoff.timestamp_millis()));
        }

        let mut sql = format!("SELECT {} FROM practice_sessions", SESSION_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY completed_at DESC, id DESC");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read practice sessions")?;
        Ok(sessions)
    }

    pub(crate) fn load_progress(conn: &Connection) -> Result<Vec<OperationProgress>> {
        let sql = format!(
            "SELECT {} FROM operation_progress ORDER BY operation, difficulty",
            PROGRESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut buckets = stmt
            .query_map([], progress_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read operation progress")?;
        // Present in domain order rather than alphabetical
        buckets.sort_by_key(|b| {
            (
                Operation::ALL.iter().position(|op| *op == b.operation),
                Difficulty::ALL.iter().position(|d| *d == b.difficulty),
            )
        });
        Ok(buckets)
    }

    pub(crate) fn load_bucket(
        conn: &Connection,
        operation: Operation,
        difficulty: Difficulty,
    ) -> Result<Option<OperationProgress>> {
        let sql = format!(
            "SELECT {} FROM operation_progress WHERE operation = ?1 AND difficulty = ?2",
            PROGRESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(
            rusqlite::params![operation.as_str(), difficulty.as_str()],
            progress_from_row,
        )?;
        let bucket = rows.next().transpose().context("Failed to read progress bucket")?;
        Ok(bucket)
    }

    pub(crate) fn load_settings(conn: &Connection) -> Result<UserSettings> {
        let json: Option<String> = conn
            .query_row("SELECT settings FROM user_settings WHERE id = 1", [], |r| r.get(0))
            .ok();
        match json {
            Some(json) => serde_json::from_str(&json).context("Stored settings are not valid JSON"),
            None => Ok(UserSettings::default()),
        }
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<PracticeSessionRecord> {
    Ok(PracticeSessionRecord {
        id: row.get(0)?,
        mode: parse_column(row, 1)?,
        operation: parse_column(row, 2)?,
        difficulty: parse_column(row, 3)?,
        problems_solved: row.get(4)?,
        correct_answers: row.get(5)?,
        session_time: row.get(6)?,
        accuracy: row.get(7)?,
        avg_time_per_problem: row.get(8)?,
        completed_at: timestamp_column(row, 9)?,
    })
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<OperationProgress> {
    Ok(OperationProgress {
        operation: parse_column(row, 0)?,
        difficulty: parse_column(row, 1)?,
        problems_solved: row.get(2)?,
        correct_answers: row.get(3)?,
        total_time: row.get(4)?,
        best_time: row.get(5)?,
        current_streak: row.get(6)?,
        last_practiced: optional_timestamp_column(row, 7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}
