//! Progress store for mathdrill
//!
//! Persists practice sessions, per-(operation, difficulty) progress,
//! the achievement catalog and user settings in a SQLite database
//! (`~/.mathdrill/progress.db`).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  CLI practice   │     │   REST server   │
//! │  (sessions)     │     │ (sync clients)  │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          └───────────┬───────────┘
//!                      ▼
//!          ~/.mathdrill/progress.db
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let store = ProgressStore::new()?;
//!
//! // Record a finished session, then evaluate achievements
//! store.recorder().record_session(&record, Utc::now())?;
//! let unlocked = store.achievements().check(Some(&record), Utc::now())?;
//!
//! // Query for the progress view
//! let summary = store.query().summary(&ProgressFilter::default(), Utc::now())?;
//! ```

pub mod achievements;
mod db;
mod export;
mod models;
mod queries;
mod recorder;
mod time_bucket;

pub use db::{ProgressDb, SCHEMA_VERSION};
pub use export::{ExportSnapshot, ImportSummary, EXPORT_VERSION};
pub use models::{
    accuracy_percent, is_mastered, mastery_score, OperationProgress, OperationSummary,
    PracticeSessionRecord, ProgressDelta, ProgressFilter, ProgressSummary, TimeWindow,
    MASTERY_MIN_ACCURACY, MASTERY_MIN_PROBLEMS,
};
pub use queries::ProgressQuery;
pub use recorder::{merged_progress, ProgressRecorder};
pub use time_bucket::{day_bucket, local_day};

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

use achievements::AchievementEngine;

/// Central handle on the progress database
///
/// Coordinates recording, querying and achievement evaluation.
/// Thread-safe through the internal mutex on the database connection.
#[derive(Clone)]
pub struct ProgressStore {
    db: ProgressDb,
}

impl ProgressStore {
    /// Open the store at the default location
    pub fn new() -> Result<Self> {
        let db = ProgressDb::open_default()?;
        Ok(Self { db })
    }

    /// Open the store at a custom database path
    pub fn with_path(path: &Path) -> Result<Self> {
        let db = ProgressDb::open(path)?;
        Ok(Self { db })
    }

    /// Private store that disappears with the process
    pub fn in_memory() -> Result<Self> {
        let db = ProgressDb::open_in_memory()?;
        Ok(Self { db })
    }

    /// Get a recorder for writing sessions, progress and settings
    pub fn recorder(&self) -> ProgressRecorder {
        ProgressRecorder::new(self.db.clone())
    }

    /// Get a query interface for reading progress
    pub fn query(&self) -> ProgressQuery {
        ProgressQuery::new(self.db.clone())
    }

    /// Get the achievement engine
    pub fn achievements(&self) -> AchievementEngine {
        AchievementEngine::new(self.db.clone())
    }

    /// Delete all data and restore the default catalog and settings
    pub fn clear_all(&self) -> Result<()> {
        self.db.reset_all()?;
        info!("[mathdrill:store] Cleared all progress");
        Ok(())
    }

    pub fn export(&self, now: DateTime<Utc>) -> Result<ExportSnapshot> {
        export::export(&self.db, now)
    }

    /// Replace the store's contents with a snapshot
    pub fn import(&self, snapshot: &ExportSnapshot) -> Result<ImportSummary> {
        export::import(&self.db, snapshot)
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &ProgressDb {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Operation, PracticeMode};
    use tempfile::tempdir;

    #[test]
    fn test_progress_store_roundtrip() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("progress.db");
        let now = Utc::now();

        {
            let store = ProgressStore::with_path(&db_path).unwrap();
            let record = PracticeSessionRecord {
                id: "roundtrip".to_string(),
                mode: PracticeMode::Timed,
                operation: Operation::Subtraction,
                difficulty: Difficulty::Advanced,
                problems_solved: 12,
                correct_answers: 9,
                session_time: 60,
                accuracy: 75.0,
                avg_time_per_problem: Some(5.0),
                completed_at: now,
            };
            store.recorder().record_session(&record, now).unwrap();
        }

        // Data survives reopening
        let store = ProgressStore::with_path(&db_path).unwrap();
        let sessions = store.query().recent_sessions(5).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "roundtrip");
        assert_eq!(sessions[0].mode, PracticeMode::Timed);
        assert_eq!(sessions[0].completed_at.timestamp_millis(), now.timestamp_millis());

        store.clear_all().unwrap();
        assert!(store.query().recent_sessions(5).unwrap().is_empty());
        assert!(store.query().progress(None, None).unwrap().is_empty());
    }
}
