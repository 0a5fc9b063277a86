//! Achievement checking logic
//!
//! Evaluates requirements against aggregates of the stored history. The same
//! aggregates feed both the unlock decision and the progress display.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::definitions::{Achievement, Requirement};
use super::streaks::consecutive_days;
use crate::domain::{Operation, PracticeMode};
use crate::stats::models::{accuracy_percent, is_mastered, OperationProgress, PracticeSessionRecord};
use crate::stats::time_bucket::local_day;

/// Sessions scanned by the `accuracy_streak` requirement
pub const ACCURACY_STREAK_WINDOW: usize = 10;

/// Snapshot of the history a check runs against
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// All stored sessions, newest first
    pub sessions: &'a [PracticeSessionRecord],
    pub progress: &'a [OperationProgress],
    /// The session that triggered the check, if any
    pub session: Option<&'a PracticeSessionRecord>,
    /// Today's local calendar date
    pub today: NaiveDate,
}

/// Accumulated totals over the recent-session window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyWindow {
    pub problems: u64,
    pub correct: u64,
    /// Whether the window accumulated the required number of problems
    pub reached: bool,
}

impl AccuracyWindow {
    pub fn accuracy(&self) -> f64 {
        accuracy_percent(self.correct, self.problems)
    }
}

impl<'a> EvaluationContext<'a> {
    pub fn total_problems(&self) -> u64 {
        self.sessions.iter().map(|s| s.problems_solved as u64).sum()
    }

    /// Mean of per-session averages, skipping sessions without one
    pub fn mean_avg_time(&self) -> Option<f64> {
        let times: Vec<f64> = self
            .sessions
            .iter()
            .filter_map(|s| s.avg_time_per_problem)
            .collect();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }

    pub fn daily_streak(&self) -> u32 {
        let days: HashSet<NaiveDate> = self
            .sessions
            .iter()
            .map(|s| local_day(s.completed_at))
            .collect();
        consecutive_days(&days, self.today)
    }

    /// Operations mastered when all difficulties are combined
    pub fn mastered_operations(&self) -> u32 {
        let mut totals: HashMap<Operation, (u64, u64)> = HashMap::new();
        for bucket in self.progress {
            let entry = totals.entry(bucket.operation).or_default();
            entry.0 += bucket.problems_solved;
            entry.1 += bucket.correct_answers;
        }
        totals
            .values()
            .filter(|(solved, correct)| is_mastered(*solved, *correct))
            .count() as u32
    }

    /// Walk the most recent sessions until `problems` have been accumulated
    pub fn accuracy_window(&self, problems: u64) -> AccuracyWindow {
        let mut window = AccuracyWindow {
            problems: 0,
            correct: 0,
            reached: false,
        };
        for session in self.sessions.iter().take(ACCURACY_STREAK_WINDOW) {
            window.problems += session.problems_solved as u64;
            window.correct += session.correct_answers as u64;
            if window.problems >= problems {
                window.reached = true;
                break;
            }
        }
        window
    }

    /// Seconds practiced on the local calendar day `today`
    pub fn time_today(&self) -> u64 {
        self.sessions
            .iter()
            .filter(|s| local_day(s.completed_at) == self.today)
            .map(|s| s.session_time as u64)
            .sum()
    }

    pub fn mode_problems(&self, mode: PracticeMode) -> u64 {
        self.sessions
            .iter()
            .filter(|s| s.mode == mode)
            .map(|s| s.problems_solved as u64)
            .sum()
    }
}

impl Requirement {
    /// Whether the requirement holds for the given history
    pub fn is_satisfied(&self, ctx: &EvaluationContext<'_>) -> bool {
        match *self {
            Requirement::ProblemsSolved { value } => ctx.total_problems() >= value,
            Requirement::SessionAccuracy { value } => {
                ctx.session.is_some_and(|s| s.accuracy >= value)
            }
            Requirement::AvgTime { value, operator } => ctx
                .mean_avg_time()
                .is_some_and(|mean| operator.holds(mean, value)),
            Requirement::DailyStreak { value } => ctx.daily_streak() >= value,
            Requirement::AllOperationsMastered { value } => ctx.mastered_operations() >= value,
            Requirement::AccuracyStreak { accuracy, problems } => {
                let window = ctx.accuracy_window(problems);
                window.reached && window.accuracy() >= accuracy
            }
            Requirement::DailyTime { value } => ctx.time_today() >= value,
            Requirement::ModeProblems { mode, value } => ctx.mode_problems(mode) >= value,
        }
    }

    /// Current value and target for progress display
    pub fn measure(&self, ctx: &EvaluationContext<'_>) -> (f64, f64) {
        match *self {
            Requirement::ProblemsSolved { value } => (ctx.total_problems() as f64, value as f64),
            Requirement::SessionAccuracy { value } => {
                (ctx.session.map_or(0.0, |s| s.accuracy), value)
            }
            Requirement::AvgTime { value, operator } => {
                let met = ctx
                    .mean_avg_time()
                    .is_some_and(|mean| operator.holds(mean, value));
                // No meaningful partial progress for a comparison
                (if met { 1.0 } else { 0.0 }, 1.0)
            }
            Requirement::DailyStreak { value } => (ctx.daily_streak() as f64, value as f64),
            Requirement::AllOperationsMastered { value } => {
                (ctx.mastered_operations() as f64, value as f64)
            }
            Requirement::AccuracyStreak { accuracy, problems } => {
                let window = ctx.accuracy_window(problems);
                if window.reached && window.accuracy() >= accuracy {
                    (problems as f64, problems as f64)
                } else {
                    (window.problems.min(problems) as f64, problems as f64)
                }
            }
            Requirement::DailyTime { value } => (ctx.time_today() as f64, value as f64),
            Requirement::ModeProblems { mode, value } => {
                (ctx.mode_problems(mode) as f64, value as f64)
            }
        }
    }
}

/// Progress toward one achievement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub current: f64,
    pub target: f64,
    /// 0-100
    pub percentage: f64,
}

impl AchievementProgress {
    pub fn compute(achievement: Achievement, ctx: &EvaluationContext<'_>) -> Self {
        let (current, target) = if achievement.is_unlocked() {
            let (_, target) = achievement.requirement.measure(ctx);
            (target, target)
        } else {
            achievement.requirement.measure(ctx)
        };
        Self {
            achievement,
            current,
            target,
            percentage: percentage(current, target),
        }
    }
}

fn percentage(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    (current / target * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use crate::stats::achievements::Comparison;
    use chrono::{DateTime, Local, TimeZone, Utc};

    fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn session(problems: u32, correct: u32, at: DateTime<Utc>) -> PracticeSessionRecord {
        PracticeSessionRecord {
            id: format!("s-{}-{}", at.timestamp_millis(), problems),
            mode: PracticeMode::Accuracy,
            operation: Operation::Addition,
            difficulty: Difficulty::Beginner,
            problems_solved: problems,
            correct_answers: correct,
            session_time: problems * 4,
            accuracy: accuracy_percent(correct as u64, problems as u64),
            avg_time_per_problem: Some(4.0),
            completed_at: at,
        }
    }

    fn ctx<'a>(
        sessions: &'a [PracticeSessionRecord],
        progress: &'a [OperationProgress],
        today: NaiveDate,
    ) -> EvaluationContext<'a> {
        EvaluationContext {
            sessions,
            progress,
            session: sessions.first(),
            today,
        }
    }

    #[test]
    fn test_session_accuracy_needs_session() {
        let sessions = vec![session(10, 10, local_noon(2024, 3, 15))];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut context = ctx(&sessions, &[], today);
        let requirement = Requirement::SessionAccuracy { value: 100.0 };
        assert!(requirement.is_satisfied(&context));
        context.session = None;
        assert!(!requirement.is_satisfied(&context));
    }

    #[test]
    fn test_avg_time_skips_missing() {
        let mut old = session(10, 10, local_noon(2024, 3, 14));
        old.avg_time_per_problem = None;
        let mut fast = session(10, 10, local_noon(2024, 3, 15));
        fast.avg_time_per_problem = Some(1.5);
        let sessions = vec![fast, old];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let context = ctx(&sessions, &[], today);
        assert_eq!(context.mean_avg_time(), Some(1.5));
        assert!(Requirement::AvgTime {
            value: 2.0,
            operator: Comparison::Less
        }
        .is_satisfied(&context));
    }

    #[test]
    fn test_avg_time_without_data_is_unsatisfied() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let context = ctx(&[], &[], today);
        assert!(!Requirement::AvgTime {
            value: 100.0,
            operator: Comparison::Less
        }
        .is_satisfied(&context));
    }

    #[test]
    fn test_accuracy_streak_window_limit() {
        // Ten perfect sessions of 4 problems never reach 50 problems
        let sessions: Vec<_> = (1..=12)
            .map(|d| session(4, 4, local_noon(2024, 3, d)))
            .rev()
            .collect();
        let today = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let context = ctx(&sessions, &[], today);
        let window = context.accuracy_window(50);
        assert!(!window.reached);
        assert_eq!(window.problems, 40);
        assert!(!Requirement::AccuracyStreak {
            accuracy: 95.0,
            problems: 50
        }
        .is_satisfied(&context));
    }

    #[test]
    fn test_accuracy_streak_stops_once_reached() {
        // Newest session alone reaches the target; older bad ones are ignored
        let sessions = vec![
            session(50, 49, local_noon(2024, 3, 15)),
            session(50, 10, local_noon(2024, 3, 14)),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let context = ctx(&sessions, &[], today);
        assert!(Requirement::AccuracyStreak {
            accuracy: 95.0,
            problems: 50
        }
        .is_satisfied(&context));
    }

    #[test]
    fn test_daily_time_counts_today_only() {
        let mut yesterday = session(10, 10, local_noon(2024, 3, 14));
        yesterday.session_time = 5000;
        let mut today_session = session(10, 10, local_noon(2024, 3, 15));
        today_session.session_time = 1799;
        let sessions = vec![today_session, yesterday];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let context = ctx(&sessions, &[], today);
        assert_eq!(context.time_today(), 1799);
        assert!(!Requirement::DailyTime { value: 1800 }.is_satisfied(&context));
    }

    #[test]
    fn test_mastery_aggregates_difficulties() {
        let mut easy = OperationProgress::empty(Operation::Addition, Difficulty::Beginner, Utc::now());
        easy.problems_solved = 30;
        easy.correct_answers = 30;
        let mut hard = OperationProgress::empty(Operation::Addition, Difficulty::Advanced, Utc::now());
        hard.problems_solved = 30;
        hard.correct_answers = 28;
        let mut short = OperationProgress::empty(Operation::Division, Difficulty::Beginner, Utc::now());
        short.problems_solved = 49;
        short.correct_answers = 49;
        let progress = vec![easy, hard, short];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let context = ctx(&[], &progress, today);
        assert_eq!(context.mastered_operations(), 1);
    }

    #[test]
    fn test_progress_is_capped() {
        let sessions = vec![session(150, 140, local_noon(2024, 3, 15))];
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let context = ctx(&sessions, &[], today);
        let achievement = crate::stats::achievements::default_catalog()
            .into_iter()
            .find(|a| a.id == "century")
            .unwrap();
        let progress = AchievementProgress::compute(achievement, &context);
        assert_eq!(progress.current, 150.0);
        assert_eq!(progress.percentage, 100.0);
    }
}
