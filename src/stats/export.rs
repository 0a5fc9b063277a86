//! Full-data export and import
//!
//! The snapshot mirrors the database: every session, every progress bucket,
//! the catalog with unlock state and the settings document.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::achievements::{Achievement, AchievementEngine};
use super::db::{clear_tables, seed_defaults, ProgressDb};
use super::models::{OperationProgress, PracticeSessionRecord, ProgressFilter};
use super::queries::ProgressQuery;
use super::recorder::ProgressRecorder;
use crate::domain::UserSettings;

/// Format version written into every export
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub sessions: Vec<PracticeSessionRecord>,
    pub progress: Vec<OperationProgress>,
    pub achievements: Vec<Achievement>,
    pub settings: UserSettings,
}

/// Counts of what an import wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub sessions: usize,
    pub progress: usize,
    pub achievements: usize,
}

impl ExportSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Export file is not a valid snapshot")
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject snapshots that would break store invariants
    pub fn validate(&self) -> Result<()> {
        let major = self.version.split('.').next().unwrap_or_default();
        if major != "1" {
            anyhow::bail!("Unsupported export version {}", self.version);
        }
        for session in &self.sessions {
            session.validate()?;
        }
        for bucket in &self.progress {
            bucket.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn export(db: &ProgressDb, now: DateTime<Utc>) -> Result<ExportSnapshot> {
    let conn = db.conn();
    let mut sessions = ProgressQuery::load_sessions(&conn, &ProgressFilter::default(), now, None)?;
    // Oldest first reads naturally in a file
    sessions.reverse();
    Ok(ExportSnapshot {
        version: EXPORT_VERSION.to_string(),
        export_date: now,
        sessions,
        progress: ProgressQuery::load_progress(&conn)?,
        achievements: AchievementEngine::load_catalog(&conn)?,
        settings: ProgressQuery::load_settings(&conn)?,
    })
}

/// Replace everything in the store with the snapshot's contents
pub(crate) fn import(db: &ProgressDb, snapshot: &ExportSnapshot) -> Result<ImportSummary> {
    snapshot.validate()?;

    let conn = db.conn();
    let tx = conn.unchecked_transaction()?;
    clear_tables(&tx)?;

    let mut sessions = 0;
    for session in &snapshot.sessions {
        if ProgressRecorder::insert_session(&tx, session)? {
            sessions += 1;
        }
    }
    for bucket in &snapshot.progress {
        ProgressRecorder::write_progress(&tx, bucket)?;
    }
    AchievementEngine::write_catalog(&tx, &snapshot.achievements)?;
    tx.execute(
        "INSERT INTO user_settings (id, settings, updated_at) VALUES (1, ?1, ?2)",
        rusqlite::params![
            serde_json::to_string(&snapshot.settings)?,
            Utc::now().timestamp_millis()
        ],
    )?;
    // Older exports may predate newer catalog entries
    seed_defaults(&tx)?;
    tx.commit()?;

    info!(
        "[mathdrill:store] Imported {} sessions, {} progress buckets, {} achievements",
        sessions,
        snapshot.progress.len(),
        snapshot.achievements.len()
    );
    Ok(ImportSummary {
        sessions,
        progress: snapshot.progress.len(),
        achievements: snapshot.achievements.len(),
    })
}
