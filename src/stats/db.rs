//! SQLite database connection and schema management for practice progress
//!
//! Manages the `~/.mathdrill/progress.db` database with automatic schema migration.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use tracing::debug;

use super::achievements::DEFAULT_ACHIEVEMENTS;
use crate::config::Config;
use crate::domain::UserSettings;
use crate::error::PracticeError;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Database wrapper shared by the recorder, queries and achievement engine
#[derive(Clone)]
pub struct ProgressDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ProgressDb {
    /// Open or create the progress database at the default location (~/.mathdrill/progress.db)
    pub fn open_default() -> Result<Self> {
        let db_path = Config::global_config_dir().join("progress.db");
        Self::open(&db_path)
    }

    /// Open or create the progress database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open progress db: {}", path.display()))?;

        // WAL so the CLI can read while `serve` writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database (tests, `serve --memory`)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Progress DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        Self::run_migrations(&conn)?;
        seed_defaults(&conn)?;
        Ok(())
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: per-problem average on sessions
        if version < 2 {
            let has_avg: bool = conn
                .prepare(
                    "SELECT COUNT(*) FROM pragma_table_info('practice_sessions') WHERE name = 'avg_time_per_problem'",
                )
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_avg {
                conn.execute_batch(
                    "ALTER TABLE practice_sessions ADD COLUMN avg_time_per_problem REAL;",
                )?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
            debug!("[mathdrill:db] Migrated schema to version 2");
        }

        Ok(())
    }

    /// Delete every session, progress bucket, unlock and setting, then reseed
    /// the default catalog and settings.
    pub fn reset_all(&self) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        clear_tables(&tx)?;
        seed_defaults(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn clear_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM practice_sessions;
        DELETE FROM operation_progress;
        DELETE FROM achievements;
        DELETE FROM user_settings;
        "#,
    )?;
    Ok(())
}

/// Insert the default achievement catalog and settings where missing.
///
/// Existing rows are never touched, so unlock state and user edits survive.
pub(crate) fn seed_defaults(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"INSERT OR IGNORE INTO achievements
           (id, position, name, description, icon, category, requirement, unlocked_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)"#,
    )?;
    for (position, def) in DEFAULT_ACHIEVEMENTS.iter().enumerate() {
        let requirement = serde_json::to_string(&def.requirement)?;
        stmt.execute(rusqlite::params![
            def.id,
            position as i64,
            def.name,
            def.description,
            def.icon,
            def.category.as_str(),
            requirement,
        ])?;
    }

    let settings = serde_json::to_string(&UserSettings::default())?;
    conn.execute(
        "INSERT OR IGNORE INTO user_settings (id, settings, updated_at) VALUES (1, ?1, ?2)",
        rusqlite::params![settings, Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

// ========================================
// ROW HELPERS
// ========================================

/// Read a text column into a domain enum
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = PracticeError>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a millisecond timestamp column
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

/// Read an optional millisecond timestamp column
pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let ms: Option<i64> = row.get(idx)?;
    ms.map(|ms| {
        DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
    })
    .transpose()
}

/// SQL schema for the progress database
const SCHEMA_SQL: &str = r#"
-- One row per saved practice session
CREATE TABLE IF NOT EXISTS practice_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    mode TEXT NOT NULL,
    operation TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    problems_solved INTEGER NOT NULL DEFAULT 0,
    correct_answers INTEGER NOT NULL DEFAULT 0,
    session_time INTEGER NOT NULL DEFAULT 0,
    accuracy REAL NOT NULL DEFAULT 0.0,
    avg_time_per_problem REAL,
    completed_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL,
    CHECK (correct_answers <= problems_solved)
);
CREATE INDEX IF NOT EXISTS idx_session_completed_at ON practice_sessions(completed_at);
CREATE INDEX IF NOT EXISTS idx_session_day ON practice_sessions(day_bucket);
CREATE INDEX IF NOT EXISTS idx_session_operation ON practice_sessions(operation, difficulty);
CREATE INDEX IF NOT EXISTS idx_session_mode ON practice_sessions(mode);

-- Cumulative progress per (operation, difficulty)
CREATE TABLE IF NOT EXISTS operation_progress (
    operation TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    problems_solved INTEGER NOT NULL DEFAULT 0,
    correct_answers INTEGER NOT NULL DEFAULT 0,
    total_time INTEGER NOT NULL DEFAULT 0,
    best_time REAL,
    current_streak INTEGER NOT NULL DEFAULT 0,
    last_practiced INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (operation, difficulty),
    CHECK (correct_answers <= problems_solved)
);

-- Achievement catalog with unlock state (requirement stored as JSON)
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    category TEXT NOT NULL,
    requirement TEXT NOT NULL,
    unlocked_at INTEGER
);

-- User settings (singleton, JSON document)
CREATE TABLE IF NOT EXISTS user_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    settings TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;
