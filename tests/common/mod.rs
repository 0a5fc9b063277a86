//! Shared test utilities for the progress store and achievement tests

#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone, Utc};
use mathdrill::domain::{Difficulty, Operation, PracticeMode};
use mathdrill::stats::{PracticeSessionRecord, ProgressStore};

/// Fresh in-memory store with the default catalog seeded
pub fn memory_store() -> ProgressStore {
    ProgressStore::in_memory().expect("Failed to open in-memory store")
}

/// Noon local time on the given date, so day buckets never straddle midnight
pub fn local_noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("noon is never ambiguous")
        .with_timezone(&Utc)
}

/// Builder for session records
pub struct RecordBuilder {
    record: PracticeSessionRecord,
}

impl RecordBuilder {
    pub fn new(id: &str, completed_at: DateTime<Utc>) -> Self {
        Self {
            record: PracticeSessionRecord {
                id: id.to_string(),
                mode: PracticeMode::Accuracy,
                operation: Operation::Addition,
                difficulty: Difficulty::Beginner,
                problems_solved: 0,
                correct_answers: 0,
                session_time: 0,
                accuracy: 0.0,
                avg_time_per_problem: None,
                completed_at,
            },
        }
    }

    pub fn mode(mut self, mode: PracticeMode) -> Self {
        self.record.mode = mode;
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.record.operation = operation;
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.record.difficulty = difficulty;
        self
    }

    /// Sets counters and derives accuracy
    pub fn answered(mut self, solved: u32, correct: u32) -> Self {
        self.record.problems_solved = solved;
        self.record.correct_answers = correct;
        self.record.accuracy = correct as f64 / solved.max(1) as f64 * 100.0;
        self
    }

    /// Sets session time and derives the per-problem average
    pub fn seconds(mut self, seconds: u32) -> Self {
        self.record.session_time = seconds;
        self.record.avg_time_per_problem =
            Some(seconds as f64 / self.record.problems_solved.max(1) as f64);
        self
    }

    pub fn build(self) -> PracticeSessionRecord {
        self.record
    }
}

/// Record a session and run the achievement check, returning the ids unlocked
pub fn record_and_check(store: &ProgressStore, record: &PracticeSessionRecord) -> Vec<String> {
    let now = record.completed_at;
    store
        .recorder()
        .record_session(record, now)
        .expect("Failed to record session");
    store
        .achievements()
        .check(Some(record), now)
        .expect("Failed to check achievements")
        .into_iter()
        .map(|a| a.id)
        .collect()
}
