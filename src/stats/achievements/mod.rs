//! Achievements: catalog, requirement evaluation and unlocking
//!
//! The catalog is data. Each entry carries a typed [`Requirement`] that is
//! evaluated against the stored session history after every saved session.

mod checker;
mod definitions;
mod manager;
mod streaks;

pub use checker::{AccuracyWindow, AchievementProgress, EvaluationContext, ACCURACY_STREAK_WINDOW};
pub use definitions::{
    default_catalog, Achievement, AchievementCategory, AchievementDef, AchievementStatus,
    Comparison, Requirement, DEFAULT_ACHIEVEMENTS, EQUAL_TOLERANCE,
};
pub use manager::AchievementEngine;
pub use streaks::{consecutive_days, extend_day_streak};
