//! Progress recorder - writes sessions, progress buckets and settings
//!
//! A session row and the matching progress upsert are written in one
//! transaction. The session id is unique, so recording the same session twice
//! is a no-op rather than a double count.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use super::achievements::extend_day_streak;
use super::db::ProgressDb;
use super::models::{OperationProgress, PracticeSessionRecord, ProgressDelta};
use super::queries::ProgressQuery;
use super::time_bucket::day_bucket;
use crate::domain::UserSettings;

/// Records progress to the database
#[derive(Clone)]
pub struct ProgressRecorder {
    db: ProgressDb,
}

impl ProgressRecorder {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    /// Append a finished session and fold it into its progress bucket.
    ///
    /// Returns `false` if a session with the same id was already stored.
    pub fn record_session(&self, record: &PracticeSessionRecord, now: DateTime<Utc>) -> Result<bool> {
        record.validate()?;

        let conn = self.db.conn();
        let tx = conn.unchecked_transaction()?;
        let inserted = Self::insert_session(&tx, record)?;
        if !inserted {
            debug!("[mathdrill:store] Session {} already recorded", record.id);
            return Ok(false);
        }
        Self::merge_progress(&tx, &ProgressDelta::from(record), now)?;
        tx.commit()?;

        debug!(
            "[mathdrill:store] Recorded {} {} session: {}/{}",
            record.operation, record.difficulty, record.correct_answers, record.problems_solved
        );
        Ok(true)
    }

    /// Add a delta to a progress bucket without a session row
    pub fn record_progress(&self, delta: &ProgressDelta, now: DateTime<Utc>) -> Result<OperationProgress> {
        delta.validate()?;
        let conn = self.db.conn();
        let tx = conn.unchecked_transaction()?;
        let merged = Self::merge_progress(&tx, delta, now)?;
        tx.commit()?;
        Ok(merged)
    }

    /// Replace the stored settings document
    pub fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        let conn = self.db.conn();
        conn.execute(
            r#"INSERT INTO user_settings (id, settings, updated_at) VALUES (1, ?1, ?2)
               ON CONFLICT(id) DO UPDATE SET settings = ?1, updated_at = ?2"#,
            rusqlite::params![json, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    // ========================================
    // CONNECTION-LEVEL HELPERS
    // ========================================

    pub(crate) fn insert_session(conn: &Connection, record: &PracticeSessionRecord) -> Result<bool> {
        let inserted = conn.execute(
            r#"INSERT OR IGNORE INTO practice_sessions
               (session_id, mode, operation, difficulty, problems_solved, correct_answers,
                session_time, accuracy, avg_time_per_problem, completed_at, day_bucket)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            rusqlite::params![
                record.id,
                record.mode.as_str(),
                record.operation.as_str(),
                record.difficulty.as_str(),
                record.problems_solved,
                record.correct_answers,
                record.session_time,
                record.accuracy,
                record.avg_time_per_problem,
                record.completed_at.timestamp_millis(),
                day_bucket(record.completed_at),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Read-merge-write of one bucket. Callers hold the connection lock.
    fn merge_progress(conn: &Connection, delta: &ProgressDelta, now: DateTime<Utc>) -> Result<OperationProgress> {
        let existing = ProgressQuery::load_bucket(conn, delta.operation, delta.difficulty)?;
        let merged = merged_progress(existing.as_ref(), delta, now);
        Self::write_progress(conn, &merged)?;
        Ok(merged)
    }

    /// Upsert a bucket. An existing row keeps its `created_at`.
    pub(crate) fn write_progress(conn: &Connection, progress: &OperationProgress) -> Result<()> {
        conn.execute(
            r#"INSERT INTO operation_progress
               (operation, difficulty, problems_solved, correct_answers, total_time,
                best_time, current_streak, last_practiced, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
               ON CONFLICT(operation, difficulty) DO UPDATE SET
                   problems_solved = ?3, correct_answers = ?4, total_time = ?5,
                   best_time = ?6, current_streak = ?7, last_practiced = ?8, updated_at = ?10"#,
            rusqlite::params![
                progress.operation.as_str(),
                progress.difficulty.as_str(),
                progress.problems_solved,
                progress.correct_answers,
                progress.total_time,
                progress.best_time,
                progress.current_streak,
                progress.last_practiced.map(|t| t.timestamp_millis()),
                progress.created_at.timestamp_millis(),
                progress.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }
}

/// Additive merge of a delta into a bucket
pub fn merged_progress(
    existing: Option<&OperationProgress>,
    delta: &ProgressDelta,
    now: DateTime<Utc>,
) -> OperationProgress {
    let base = existing
        .cloned()
        .unwrap_or_else(|| OperationProgress::empty(delta.operation, delta.difficulty, now));

    let best_time = match (base.best_time, delta.best_time) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    let last_practiced = Some(base.last_practiced.map_or(now, |last| last.max(now)));

    OperationProgress {
        operation: delta.operation,
        difficulty: delta.difficulty,
        problems_solved: base.problems_solved + delta.problems_solved,
        correct_answers: base.correct_answers + delta.correct_answers,
        total_time: base.total_time + delta.total_time,
        best_time,
        current_streak: extend_day_streak(base.current_streak, base.last_practiced, now),
        last_practiced,
        created_at: base.created_at,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Operation, PracticeMode};
    use crate::stats::ProgressStore;
    use chrono::{Duration, Local, TimeZone};

    fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record(id: &str, solved: u32, correct: u32, avg: f64, at: DateTime<Utc>) -> PracticeSessionRecord {
        PracticeSessionRecord {
            id: id.to_string(),
            mode: PracticeMode::Accuracy,
            operation: Operation::Multiplication,
            difficulty: Difficulty::Intermediate,
            problems_solved: solved,
            correct_answers: correct,
            session_time: (solved as f64 * avg) as u32,
            accuracy: correct as f64 / solved.max(1) as f64 * 100.0,
            avg_time_per_problem: Some(avg),
            completed_at: at,
        }
    }

    #[test]
    fn test_additive_merge() {
        let store = ProgressStore::in_memory().unwrap();
        let day1 = local_noon(2024, 3, 14);
        let day2 = local_noon(2024, 3, 15);

        store.recorder().record_session(&record("a", 10, 8, 4.0, day1), day1).unwrap();
        store.recorder().record_session(&record("b", 20, 19, 3.0, day2), day2).unwrap();

        let bucket = store
            .query()
            .bucket(Operation::Multiplication, Difficulty::Intermediate)
            .unwrap()
            .unwrap();
        assert_eq!(bucket.problems_solved, 30);
        assert_eq!(bucket.correct_answers, 27);
        assert_eq!(bucket.total_time, 100);
        assert_eq!(bucket.best_time, Some(3.0));
        assert_eq!(bucket.current_streak, 2);
        assert_eq!(bucket.last_practiced.map(|t| t.timestamp_millis()), Some(day2.timestamp_millis()));
        assert_eq!(bucket.created_at.timestamp_millis(), day1.timestamp_millis());
        assert_eq!(bucket.updated_at.timestamp_millis(), day2.timestamp_millis());
    }

    #[test]
    fn test_same_session_recorded_once() {
        let store = ProgressStore::in_memory().unwrap();
        let now = Utc::now();
        let session = record("dup", 10, 10, 2.0, now);

        assert!(store.recorder().record_session(&session, now).unwrap());
        assert!(!store.recorder().record_session(&session, now).unwrap());

        let bucket = store
            .query()
            .bucket(Operation::Multiplication, Difficulty::Intermediate)
            .unwrap()
            .unwrap();
        assert_eq!(bucket.problems_solved, 10);
        assert_eq!(store.query().recent_sessions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_inconsistent_record_rejected() {
        let store = ProgressStore::in_memory().unwrap();
        let now = Utc::now();
        let mut bad = record("bad", 5, 5, 2.0, now);
        bad.correct_answers = 6;
        assert!(store.recorder().record_session(&bad, now).is_err());
        assert!(store.query().recent_sessions(10).unwrap().is_empty());
    }

    #[test]
    fn test_last_practiced_never_moves_back() {
        let day2 = local_noon(2024, 3, 15);
        let delta = ProgressDelta {
            operation: Operation::Addition,
            difficulty: Difficulty::Beginner,
            problems_solved: 5,
            correct_answers: 5,
            total_time: 10,
            best_time: None,
        };
        let first = merged_progress(None, &delta, day2);
        let second = merged_progress(Some(&first), &delta, day2 - Duration::days(3));
        assert_eq!(second.last_practiced, Some(day2));
        assert_eq!(second.created_at, day2);
        assert_eq!(second.problems_solved, 10);
        assert_eq!(second.best_time, None);
    }

    #[test]
    fn test_settings_roundtrip() {
        let store = ProgressStore::in_memory().unwrap();
        let mut settings = UserSettings::default();
        settings.dark_mode = true;
        settings.voice_speed = 1.5;
        store.recorder().save_settings(&settings).unwrap();
        assert_eq!(store.query().settings().unwrap(), settings);
    }
}
