//! Achievements command implementation

use anyhow::Result;
use chrono::{Local, Utc};

use mathdrill::stats::achievements::AchievementCategory;

use super::AppContext;

/// List the catalog grouped by category with progress towards each entry
pub fn achievements_command(ctx: &AppContext, json: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let progress = store.achievements().progress(None, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    let unlocked = progress.iter().filter(|p| p.achievement.is_unlocked()).count();
    println!("Achievements: {}/{} unlocked", unlocked, progress.len());

    for category in AchievementCategory::ALL {
        let entries: Vec<_> = progress
            .iter()
            .filter(|p| p.achievement.category == category)
            .collect();
        if entries.is_empty() {
            continue;
        }

        println!("\n{}:", category.label());
        for entry in entries {
            let achievement = &entry.achievement;
            let state = match achievement.status.unlocked_at() {
                Some(at) => format!("unlocked {}", at.with_timezone(&Local).format("%Y-%m-%d")),
                None => format!("{:.0}/{:.0} ({:.0}%)", entry.current, entry.target, entry.percentage),
            };
            println!(
                "  {} {:<16} {:<45} {}",
                achievement.icon, achievement.name, achievement.description, state
            );
        }
    }

    Ok(())
}
