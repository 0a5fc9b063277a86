//! Achievement engine - unlock evaluation and catalog storage
//!
//! Handles achievement checking, progress display and the unlock writes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tracing::info;

use super::checker::{AchievementProgress, EvaluationContext};
use super::definitions::{Achievement, AchievementCategory, AchievementStatus};
use crate::stats::db::{optional_timestamp_column, ProgressDb};
use crate::stats::models::{PracticeSessionRecord, ProgressFilter};
use crate::stats::queries::ProgressQuery;
use crate::stats::time_bucket::local_day;

/// Evaluates the stored catalog against the stored history
#[derive(Clone)]
pub struct AchievementEngine {
    db: ProgressDb,
}

impl AchievementEngine {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    // ========================================
    // CATALOG
    // ========================================

    /// Full catalog in evaluation order
    pub fn catalog(&self) -> Result<Vec<Achievement>> {
        let conn = self.db.conn();
        Self::load_catalog(&conn)
    }

    pub fn unlocked(&self) -> Result<Vec<Achievement>> {
        Ok(self
            .catalog()?
            .into_iter()
            .filter(Achievement::is_unlocked)
            .collect())
    }

    pub fn unlocked_count(&self) -> Result<usize> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM achievements WHERE unlocked_at IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    // ========================================
    // EVALUATION
    // ========================================

    /// Unlock every locked achievement whose requirement now holds.
    ///
    /// `session` is the record that triggered the check; without it,
    /// session-scoped requirements never hold. Newly unlocked achievements are
    /// returned in catalog order.
    pub fn check(&self, session: Option<&PracticeSessionRecord>, now: DateTime<Utc>) -> Result<Vec<Achievement>> {
        let conn = self.db.conn();
        let tx = conn.unchecked_transaction()?;

        let catalog = Self::load_catalog(&tx)?;
        let sessions = ProgressQuery::load_sessions(&tx, &ProgressFilter::default(), now, None)?;
        let progress = ProgressQuery::load_progress(&tx)?;
        let ctx = EvaluationContext {
            sessions: &sessions,
            progress: &progress,
            session,
            today: local_day(now),
        };

        let mut newly_unlocked = Vec::new();
        for mut achievement in catalog.into_iter().filter(|a| !a.is_unlocked()) {
            if !achievement.requirement.is_satisfied(&ctx) {
                continue;
            }
            if Self::unlock(&tx, &achievement.id, now)? {
                info!(
                    "[mathdrill:achievements] Unlocked {} ({})",
                    achievement.name, achievement.id
                );
                achievement.status = AchievementStatus::Unlocked { at: now };
                newly_unlocked.push(achievement);
            }
        }

        tx.commit()?;
        Ok(newly_unlocked)
    }

    /// Progress toward every achievement, in catalog order
    pub fn progress(&self, session: Option<&PracticeSessionRecord>, now: DateTime<Utc>) -> Result<Vec<AchievementProgress>> {
        let conn = self.db.conn();
        let catalog = Self::load_catalog(&conn)?;
        let sessions = ProgressQuery::load_sessions(&conn, &ProgressFilter::default(), now, None)?;
        let progress = ProgressQuery::load_progress(&conn)?;
        let ctx = EvaluationContext {
            sessions: &sessions,
            progress: &progress,
            session,
            today: local_day(now),
        };

        Ok(catalog
            .into_iter()
            .map(|a| AchievementProgress::compute(a, &ctx))
            .collect())
    }

    // ========================================
    // CONNECTION-LEVEL HELPERS
    // ========================================

    /// Set `unlocked_at` if still unset. Returns whether this call unlocked it.
    fn unlock(conn: &Connection, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE achievements SET unlocked_at = ?2 WHERE id = ?1 AND unlocked_at IS NULL",
            rusqlite::params![id, now.timestamp_millis()],
        )?;
        Ok(updated > 0)
    }

    pub(crate) fn load_catalog(conn: &Connection) -> Result<Vec<Achievement>> {
        let mut stmt = conn.prepare(
            r#"SELECT id, name, description, icon, category, requirement, unlocked_at
               FROM achievements ORDER BY position, id"#,
        )?;
        let rows = stmt
            .query_map([], catalog_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|row| -> Result<Achievement> {
                let requirement = serde_json::from_str(&row.requirement).with_context(|| {
                    format!("Achievement {} has an unreadable requirement", row.id)
                })?;
                let category = row
                    .category
                    .parse::<AchievementCategory>()
                    .with_context(|| format!("Achievement {} has unknown category {}", row.id, row.category))?;
                Ok(Achievement {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    icon: row.icon,
                    category,
                    requirement,
                    status: row.unlocked_at.into(),
                })
            })
            .collect()
    }

    /// Replace the whole catalog (import)
    pub(crate) fn write_catalog(conn: &Connection, catalog: &[Achievement]) -> Result<()> {
        conn.execute("DELETE FROM achievements", [])?;
        let mut stmt = conn.prepare(
            r#"INSERT INTO achievements
               (id, position, name, description, icon, category, requirement, unlocked_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )?;
        for (position, achievement) in catalog.iter().enumerate() {
            stmt.execute(rusqlite::params![
                achievement.id,
                position as i64,
                achievement.name,
                achievement.description,
                achievement.icon,
                achievement.category.as_str(),
                serde_json::to_string(&achievement.requirement)?,
                achievement.status.unlocked_at().map(|t| t.timestamp_millis()),
            ])?;
        }
        Ok(())
    }
}

struct CatalogRow {
    id: String,
    name: String,
    description: String,
    icon: String,
    category: String,
    requirement: String,
    unlocked_at: Option<DateTime<Utc>>,
}

fn catalog_row(row: &Row<'_>) -> rusqlite::Result<CatalogRow> {
    Ok(CatalogRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        category: row.get(4)?,
        requirement: row.get(5)?,
        unlocked_at: optional_timestamp_column(row, 6)?,
    })
}
