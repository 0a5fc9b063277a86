//! Export, import and clear commands

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

use mathdrill::stats::ExportSnapshot;

use super::{confirm, AppContext};

/// Write a full snapshot as pretty JSON
pub fn export_command(ctx: &AppContext, output: Option<&Path>) -> Result<()> {
    let store = ctx.open_store()?;
    let snapshot = store.export(Utc::now())?;
    let json = snapshot.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} sessions, {} progress buckets to {}",
                snapshot.sessions.len(),
                snapshot.progress.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Replace everything in the store with the contents of an export file
pub fn import_command(ctx: &AppContext, file: &Path, yes: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let snapshot = ExportSnapshot::from_json(&content)?;
    snapshot.validate()?;

    if !yes && !confirm("Importing replaces all current progress. Continue?")? {
        println!("Aborted.");
        return Ok(());
    }

    let store = ctx.open_store()?;
    let summary = store.import(&snapshot)?;
    println!(
        "Imported {} sessions, {} progress buckets, {} achievements",
        summary.sessions, summary.progress, summary.achievements
    );
    Ok(())
}

pub fn clear_command(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete all progress, achievements and settings?")? {
        println!("Aborted.");
        return Ok(());
    }
    ctx.open_store()?.clear_all()?;
    println!("All progress cleared.");
    Ok(())
}
