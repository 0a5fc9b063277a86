//! Achievement definitions and metadata
//!
//! The default catalog lives here as static data. It is copied into the
//! database on first run; from then on the stored catalog is authoritative and
//! only its unlock timestamps change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::PracticeMode;
use crate::error::PracticeError;

/// Grouping shown in the achievements view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Accuracy,
    Speed,
    Streak,
    Milestone,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 4] = [
        Self::Milestone,
        Self::Accuracy,
        Self::Speed,
        Self::Streak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Speed => "speed",
            Self::Streak => "streak",
            Self::Milestone => "milestone",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Accuracy => "Accuracy",
            Self::Speed => "Speed",
            Self::Streak => "Streaks",
            Self::Milestone => "Milestones",
        }
    }
}

impl FromStr for AchievementCategory {
    type Err = PracticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accuracy" => Ok(Self::Accuracy),
            "speed" => Ok(Self::Speed),
            "streak" => Ok(Self::Streak),
            "milestone" => Ok(Self::Milestone),
            other => Err(PracticeError::invalid_config(format!(
                "unrecognized achievement category '{}'",
                other
            ))),
        }
    }
}

/// Comparison used by the `avg_time` requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Less,
    Greater,
    Equal,
}

/// Tolerance for [`Comparison::Equal`], in seconds
pub const EQUAL_TOLERANCE: f64 = 0.1;

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Less => value < threshold,
            Self::Greater => value > threshold,
            Self::Equal => (value - threshold).abs() <= EQUAL_TOLERANCE,
        }
    }
}

/// Unlock condition of an achievement
///
/// Stored as JSON (`{"type": "problems_solved", "value": 100}`), so catalogs
/// from older exports keep deserializing as long as the tags stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// Total problems across all sessions >= value
    ProblemsSolved { value: u64 },
    /// Accuracy of the triggering session >= value (percent)
    SessionAccuracy { value: f64 },
    /// Mean per-session average time compared against value (seconds)
    AvgTime { value: f64, operator: Comparison },
    /// Consecutive local days with at least one session, ending today
    DailyStreak { value: u32 },
    /// Distinct operations with a mastered bucket >= value
    AllOperationsMastered { value: u32 },
    /// Accuracy over the most recent `problems` problems >= `accuracy`
    AccuracyStreak { accuracy: f64, problems: u64 },
    /// Seconds practiced today >= value
    DailyTime { value: u64 },
    /// Problems solved in a given mode >= value
    ModeProblems { mode: PracticeMode, value: u64 },
}

/// Whether an achievement has been earned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AchievementStatus {
    #[default]
    Locked,
    Unlocked { at: DateTime<Utc> },
}

impl AchievementStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }

    pub fn unlocked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Locked => None,
            Self::Unlocked { at } => Some(*at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for AchievementStatus {
    fn from(at: Option<DateTime<Utc>>) -> Self {
        at.map_or(Self::Locked, |at| Self::Unlocked { at })
    }
}

/// Catalog entry with its unlock state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    pub requirement: Requirement,
    #[serde(
        rename = "unlockedAt",
        default,
        with = "unlock_status",
        skip_serializing_if = "AchievementStatus::is_locked"
    )]
    pub status: AchievementStatus,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        !self.status.is_locked()
    }
}

/// Maps [`AchievementStatus`] to an optional `unlockedAt` timestamp
mod unlock_status {
    use super::AchievementStatus;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &AchievementStatus, s: S) -> Result<S::Ok, S::Error> {
        match status.unlocked_at() {
            Some(at) => s.serialize_some(&at),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AchievementStatus, D::Error> {
        let at: Option<DateTime<Utc>> = Option::deserialize(d)?;
        Ok(at.into())
    }
}

/// Static catalog entry
#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: AchievementCategory,
    pub requirement: Requirement,
}

impl AchievementDef {
    pub fn to_achievement(&self) -> Achievement {
        Achievement {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            category: self.category,
            requirement: self.requirement,
            status: AchievementStatus::Locked,
        }
    }
}

/// Catalog seeded into a fresh database
pub static DEFAULT_ACHIEVEMENTS: &[AchievementDef] = &[
    // === MILESTONE ===
    AchievementDef {
        id: "first_steps",
        name: "First Steps",
        description: "Solve your first problem",
        icon: "🎯",
        category: AchievementCategory::Milestone,
        requirement: Requirement::ProblemsSolved { value: 1 },
    },
    AchievementDef {
        id: "century",
        name: "Century",
        description: "Solve 100 problems",
        icon: "💯",
        category: AchievementCategory::Milestone,
        requirement: Requirement::ProblemsSolved { value: 100 },
    },
    AchievementDef {
        id: "problem_master",
        name: "Problem Master",
        description: "Solve 1000 problems",
        icon: "🏆",
        category: AchievementCategory::Milestone,
        requirement: Requirement::ProblemsSolved { value: 1000 },
    },
    AchievementDef {
        id: "all_rounder",
        name: "All-Rounder",
        description: "Master all five operations (90% accuracy over 50+ problems each)",
        icon: "🧠",
        category: AchievementCategory::Milestone,
        requirement: Requirement::AllOperationsMastered { value: 5 },
    },
    // === ACCURACY ===
    AchievementDef {
        id: "sharp_shooter",
        name: "Sharp Shooter",
        description: "Finish a session with at least 90% accuracy",
        icon: "🏹",
        category: AchievementCategory::Accuracy,
        requirement: Requirement::SessionAccuracy { value: 90.0 },
    },
    AchievementDef {
        id: "perfectionist",
        name: "Perfectionist",
        description: "Finish a session with 100% accuracy",
        icon: "💎",
        category: AchievementCategory::Accuracy,
        requirement: Requirement::SessionAccuracy { value: 100.0 },
    },
    AchievementDef {
        id: "consistent",
        name: "Consistency",
        description: "Keep 95% accuracy over your last 50 problems",
        icon: "✨",
        category: AchievementCategory::Accuracy,
        requirement: Requirement::AccuracyStreak {
            accuracy: 95.0,
            problems: 50,
        },
    },
    AchievementDef {
        id: "accuracy_ace",
        name: "Accuracy Ace",
        description: "Solve 100 problems in accuracy mode",
        icon: "🎖️",
        category: AchievementCategory::Accuracy,
        requirement: Requirement::ModeProblems {
            mode: PracticeMode::Accuracy,
            value: 100,
        },
    },
    // === SPEED ===
    AchievementDef {
        id: "quick_thinker",
        name: "Quick Thinker",
        description: "Average under 5 seconds per problem",
        icon: "⚡",
        category: AchievementCategory::Speed,
        requirement: Requirement::AvgTime {
            value: 5.0,
            operator: Comparison::Less,
        },
    },
    AchievementDef {
        id: "lightning",
        name: "Lightning Calculator",
        description: "Average under 2 seconds per problem",
        icon: "🌩️",
        category: AchievementCategory::Speed,
        requirement: Requirement::AvgTime {
            value: 2.0,
            operator: Comparison::Less,
        },
    },
    AchievementDef {
        id: "time_trialist",
        name: "Time Trialist",
        description: "Solve 100 problems in timed mode",
        icon: "⏱️",
        category: AchievementCategory::Speed,
        requirement: Requirement::ModeProblems {
            mode: PracticeMode::Timed,
            value: 100,
        },
    },
    AchievementDef {
        id: "good_listener",
        name: "Good Listener",
        description: "Solve 50 problems in audio mode",
        icon: "🎧",
        category: AchievementCategory::Speed,
        requirement: Requirement::ModeProblems {
            mode: PracticeMode::Audio,
            value: 50,
        },
    },
    // === STREAK ===
    AchievementDef {
        id: "on_fire",
        name: "On Fire",
        description: "Practice 3 days in a row",
        icon: "🔥",
        category: AchievementCategory::Streak,
        requirement: Requirement::DailyStreak { value: 3 },
    },
    AchievementDef {
        id: "week_warrior",
        name: "Week Warrior",
        description: "Practice 7 days in a row",
        icon: "📅",
        category: AchievementCategory::Streak,
        requirement: Requirement::DailyStreak { value: 7 },
    },
    AchievementDef {
        id: "monthly_master",
        name: "Monthly Master",
        description: "Practice 30 days in a row",
        icon: "👑",
        category: AchievementCategory::Streak,
        requirement: Requirement::DailyStreak { value: 30 },
    },
    AchievementDef {
        id: "dedicated",
        name: "Dedicated",
        description: "Practice for 30 minutes in a single day",
        icon: "⏳",
        category: AchievementCategory::Streak,
        requirement: Requirement::DailyTime { value: 1800 },
    },
];

/// The default catalog as owned, locked achievements
pub fn default_catalog() -> Vec<Achievement> {
    DEFAULT_ACHIEVEMENTS.iter().map(|d| d.to_achievement()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<_> = DEFAULT_ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), DEFAULT_ACHIEVEMENTS.len());
    }

    #[test]
    fn test_requirement_json_shape() {
        let json = serde_json::to_value(Requirement::AccuracyStreak {
            accuracy: 95.0,
            problems: 50,
        })
        .unwrap();
        assert_eq!(json["type"], "accuracy_streak");
        assert_eq!(json["problems"], 50);

        let parsed: Requirement =
            serde_json::from_str(r#"{"type":"avg_time","value":5,"operator":"less"}"#).unwrap();
        assert_eq!(
            parsed,
            Requirement::AvgTime {
                value: 5.0,
                operator: Comparison::Less
            }
        );

        let parsed: Requirement =
            serde_json::from_str(r#"{"type":"mode_problems","mode":"audio","value":50}"#).unwrap();
        assert!(matches!(
            parsed,
            Requirement::ModeProblems {
                mode: PracticeMode::Audio,
                value: 50
            }
        ));
    }

    #[test]
    fn test_unlocked_at_serialization() {
        let mut achievement = DEFAULT_ACHIEVEMENTS[0].to_achievement();
        let json = serde_json::to_value(&achievement).unwrap();
        assert!(json.get("unlockedAt").is_none());

        let at = Utc::now();
        achievement.status = AchievementStatus::Unlocked { at };
        let json = serde_json::to_string(&achievement).unwrap();
        assert!(json.contains("unlockedAt"));

        let back: Achievement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status.unlocked_at().map(|t| t.timestamp_millis()), Some(at.timestamp_millis()));
    }

    #[test]
    fn test_category_parse() {
        for category in AchievementCategory::ALL {
            assert_eq!(category.as_str().parse::<AchievementCategory>().unwrap(), category);
        }
        assert_eq!("Streak".parse::<AchievementCategory>().unwrap(), AchievementCategory::Streak);
        assert!(matches!(
            "bonus".parse::<AchievementCategory>(),
            Err(PracticeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_comparison() {
        assert!(Comparison::Less.holds(4.9, 5.0));
        assert!(!Comparison::Less.holds(5.0, 5.0));
        assert!(Comparison::Greater.holds(5.1, 5.0));
        assert!(Comparison::Equal.holds(5.05, 5.0));
        assert!(!Comparison::Equal.holds(5.2, 5.0));
    }
}
