//! Data models for practice progress
//!
//! These structures represent the data stored in and queried from the progress database.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{Difficulty, Operation, PracticeMode};
use crate::error::PracticeError;

/// Problems an operation needs before it can count as mastered
pub const MASTERY_MIN_PROBLEMS: u64 = 50;
/// Accuracy (percent) an operation must exceed to count as mastered
pub const MASTERY_MIN_ACCURACY: f64 = 90.0;

/// Summary of one finished practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSessionRecord {
    pub id: String,
    pub mode: PracticeMode,
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub problems_solved: u32,
    pub correct_answers: u32,
    /// Seconds
    pub session_time: u32,
    /// Percent, 0-100
    pub accuracy: f64,
    /// Seconds per problem; older records may not carry it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_time_per_problem: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl PracticeSessionRecord {
    /// Check the record's counters are consistent
    pub fn validate(&self) -> Result<(), PracticeError> {
        if self.correct_answers > self.problems_solved {
            return Err(PracticeError::invalid_config(format!(
                "session {} has {} correct answers but only {} problems",
                self.id, self.correct_answers, self.problems_solved
            )));
        }
        if !(0.0..=100.0).contains(&self.accuracy) {
            return Err(PracticeError::invalid_config(format!(
                "session {} has accuracy {} outside 0-100",
                self.id, self.accuracy
            )));
        }
        Ok(())
    }
}

/// Cumulative statistics for one (operation, difficulty) bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationProgress {
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub problems_solved: u64,
    pub correct_answers: u64,
    /// Seconds across all sessions
    pub total_time: u64,
    /// Best average seconds per problem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_time: Option<f64>,
    /// Consecutive calendar days this bucket was practiced
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_practiced: Option<DateTime<Utc>>,
    /// First time anything was written to this bucket
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OperationProgress {
    /// A bucket with no practice yet, created at `now`
    pub fn empty(operation: Operation, difficulty: Difficulty, now: DateTime<Utc>) -> Self {
        Self {
            operation,
            difficulty,
            problems_solved: 0,
            correct_answers: 0,
            total_time: 0,
            best_time: None,
            current_streak: 0,
            last_practiced: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn accuracy(&self) -> f64 {
        accuracy_percent(self.correct_answers, self.problems_solved)
    }

    pub fn validate(&self) -> Result<(), PracticeError> {
        if self.correct_answers > self.problems_solved {
            return Err(PracticeError::invalid_config(format!(
                "{} {} progress has {} correct answers but only {} problems",
                self.operation, self.difficulty, self.correct_answers, self.problems_solved
            )));
        }
        Ok(())
    }
}

/// Increment applied to a progress bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub problems_solved: u64,
    pub correct_answers: u64,
    #[serde(default)]
    pub total_time: u64,
    #[serde(default)]
    pub best_time: Option<f64>,
}

impl ProgressDelta {
    pub fn validate(&self) -> Result<(), PracticeError> {
        if self.correct_answers > self.problems_solved {
            return Err(PracticeError::invalid_config(format!(
                "progress update has {} correct answers but only {} problems",
                self.correct_answers, self.problems_solved
            )));
        }
        if self.best_time.is_some_and(|t| !t.is_finite() || t < 0.0) {
            return Err(PracticeError::invalid_config("best time must be a positive number"));
        }
        Ok(())
    }
}

impl From<&PracticeSessionRecord> for ProgressDelta {
    fn from(record: &PracticeSessionRecord) -> Self {
        Self {
            operation: record.operation,
            difficulty: record.difficulty,
            problems_solved: record.problems_solved as u64,
            correct_answers: record.correct_answers as u64,
            total_time: record.session_time as u64,
            // An empty session says nothing about speed
            best_time: if record.problems_solved > 0 {
                record.avg_time_per_problem
            } else {
                None
            },
        }
    }
}

/// Time window for history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeWindow {
    pub fn days(&self) -> Option<i64> {
        match self {
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::Year => Some(365),
            Self::All => None,
        }
    }

    /// Earliest instant inside the window
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|d| now - Duration::days(d))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = PracticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "7d" => Ok(Self::Week),
            "month" | "30d" => Ok(Self::Month),
            "year" | "365d" => Ok(Self::Year),
            "all" | "" => Ok(Self::All),
            other => Err(PracticeError::invalid_config(format!(
                "unknown time window '{}'",
                other
            ))),
        }
    }
}

/// Filter for session history and summaries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressFilter {
    pub operation: Option<Operation>,
    pub difficulty: Option<Difficulty>,
    pub mode: Option<PracticeMode>,
    pub window: TimeWindow,
}

impl ProgressFilter {
    pub fn matches(&self, record: &PracticeSessionRecord, now: DateTime<Utc>) -> bool {
        self.operation.is_none_or(|op| op == record.operation)
            && self.difficulty.is_none_or(|d| d == record.difficulty)
            && self.mode.is_none_or(|m| m == record.mode)
            && self
                .window
                .cutoff(now)
                .is_none_or(|cutoff| record.completed_at >= cutoff)
    }
}

/// Totals for one operation inside a summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub operation: Operation,
    pub sessions: u64,
    pub problems_solved: u64,
    pub correct_answers: u64,
    pub accuracy: f64,
    pub mastery_score: f64,
}

/// Aggregate numbers shown by the progress view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_sessions: u64,
    pub problems_solved: u64,
    pub correct_answers: u64,
    /// Seconds
    pub total_time: u64,
    pub accuracy: f64,
    pub mastery_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_time_per_problem: Option<f64>,
    pub by_operation: Vec<OperationSummary>,
}

impl ProgressSummary {
    /// Fold filtered sessions into a summary
    pub fn from_sessions(sessions: &[PracticeSessionRecord]) -> Self {
        let mut summary = Self::default();
        for record in sessions {
            summary.total_sessions += 1;
            summary.problems_solved += record.problems_solved as u64;
            summary.correct_answers += record.correct_answers as u64;
            summary.total_time += record.session_time as u64;
        }
        summary.accuracy = accuracy_percent(summary.correct_answers, summary.problems_solved);
        summary.mastery_score = mastery_score(summary.accuracy, summary.problems_solved);
        if summary.problems_solved > 0 {
            summary.average_time_per_problem =
                Some(summary.total_time as f64 / summary.problems_solved as f64);
        }

        summary.by_operation = Operation::ALL
            .iter()
            .filter_map(|&operation| {
                let mut row = OperationSummary {
                    operation,
                    sessions: 0,
                    problems_solved: 0,
                    correct_answers: 0,
                    accuracy: 0.0,
                    mastery_score: 0.0,
                };
                for record in sessions.iter().filter(|r| r.operation == operation) {
                    row.sessions += 1;
                    row.problems_solved += record.problems_solved as u64;
                    row.correct_answers += record.correct_answers as u64;
                }
                if row.sessions == 0 {
                    return None;
                }
                row.accuracy = accuracy_percent(row.correct_answers, row.problems_solved);
                row.mastery_score = mastery_score(row.accuracy, row.problems_solved);
                Some(row)
            })
            .collect();
        summary
    }
}

/// correct / max(solved, 1) as a percentage
pub fn accuracy_percent(correct: u64, solved: u64) -> f64 {
    correct as f64 / solved.max(1) as f64 * 100.0
}

/// accuracy x min(solved, 100) / 100, a 0-100 score that rewards volume
pub fn mastery_score(accuracy: f64, solved: u64) -> f64 {
    accuracy * solved.min(100) as f64 / 100.0
}

/// Above 90% accuracy over at least 50 problems
pub fn is_mastered(solved: u64, correct: u64) -> bool {
    solved >= MASTERY_MIN_PROBLEMS && accuracy_percent(correct, solved) > MASTERY_MIN_ACCURACY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(op: Operation, solved: u32, correct: u32, days_ago: i64) -> PracticeSessionRecord {
        PracticeSessionRecord {
            id: format!("s-{}-{}", op, days_ago),
            mode: PracticeMode::Accuracy,
            operation: op,
            difficulty: Difficulty::Beginner,
            problems_solved: solved,
            correct_answers: correct,
            session_time: solved * 3,
            accuracy: accuracy_percent(correct as u64, solved as u64),
            avg_time_per_problem: Some(3.0),
            completed_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_accuracy_and_mastery_formulas() {
        assert_eq!(accuracy_percent(0, 0), 0.0);
        assert_eq!(accuracy_percent(45, 50), 90.0);
        assert_eq!(mastery_score(90.0, 50), 45.0);
        assert_eq!(mastery_score(90.0, 500), 90.0);
        assert!(is_mastered(50, 46));
        assert!(!is_mastered(50, 45));
        assert!(!is_mastered(49, 49));
        assert!(!is_mastered(100, 89));
    }

    #[test]
    fn test_mastery_score_multiplies_before_dividing() {
        let accuracy = accuracy_percent(1, 3);
        let expected = accuracy * 3.0 / 100.0;
        assert_eq!(mastery_score(accuracy, 3).to_bits(), expected.to_bits());

        let accuracy = accuracy_percent(2, 3);
        assert_eq!(mastery_score(accuracy, 3).to_bits(), (accuracy * 3.0 / 100.0).to_bits());

        // Volume is capped at 100 problems
        let accuracy = accuracy_percent(200, 300);
        assert_eq!(mastery_score(accuracy, 300).to_bits(), (accuracy * 100.0 / 100.0).to_bits());
    }

    #[test]
    fn test_window_filter() {
        let now = Utc::now();
        let filter = ProgressFilter {
            window: TimeWindow::Week,
            ..Default::default()
        };
        assert!(filter.matches(&record(Operation::Addition, 10, 9, 2), now));
        assert!(!filter.matches(&record(Operation::Addition, 10, 9, 8), now));
        assert!(ProgressFilter::default().matches(&record(Operation::Addition, 10, 9, 800), now));
    }

    #[test]
    fn test_summary_by_operation() {
        let sessions = vec![
            record(Operation::Addition, 20, 18, 0),
            record(Operation::Addition, 30, 27, 1),
            record(Operation::Division, 10, 5, 1),
        ];
        let summary = ProgressSummary::from_sessions(&sessions);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.problems_solved, 60);
        assert_eq!(summary.correct_answers, 50);
        assert_eq!(summary.by_operation.len(), 2);
        let addition = &summary.by_operation[0];
        assert_eq!(addition.operation, Operation::Addition);
        assert_eq!(addition.problems_solved, 50);
        assert_eq!(addition.accuracy, 90.0);
        assert_eq!(addition.mastery_score, 45.0);
    }

    #[test]
    fn test_empty_session_has_no_best_time() {
        let delta = ProgressDelta::from(&record(Operation::Addition, 0, 0, 0));
        assert_eq!(delta.best_time, None);
    }

    #[test]
    fn test_time_window_parse() {
        assert_eq!("week".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert_eq!("ALL".parse::<TimeWindow>().unwrap(), TimeWindow::All);
        assert!("decade".parse::<TimeWindow>().is_err());
    }
}
