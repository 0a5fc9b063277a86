//! Stats command implementation

use anyhow::Result;
use chrono::{Local, Utc};
use clap::Args;

use mathdrill::domain::{Difficulty, Operation, PracticeMode};
use mathdrill::stats::{is_mastered, ProgressFilter, TimeWindow};

use super::AppContext;

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[arg(short, long)]
    pub operation: Option<Operation>,

    #[arg(short, long)]
    pub difficulty: Option<Difficulty>,

    #[arg(short, long)]
    pub mode: Option<PracticeMode>,

    /// week, month, year or all
    #[arg(short, long, default_value = "all")]
    pub window: TimeWindow,

    /// Recent sessions to list
    #[arg(long, default_value_t = 5)]
    pub recent: usize,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show summary, per-bucket progress and recent sessions
pub fn stats_command(ctx: &AppContext, args: StatsArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let query = store.query();
    let now = Utc::now();

    let filter = ProgressFilter {
        operation: args.operation,
        difficulty: args.difficulty,
        mode: args.mode,
        window: args.window,
    };
    let summary = query.summary(&filter, now)?;
    let progress = query.progress(args.operation, args.difficulty)?;
    let mut sessions = query.sessions(&filter, now)?;
    sessions.truncate(args.recent);

    if args.json {
        let value = serde_json::json!({
            "summary": summary,
            "progress": progress,
            "recentSessions": sessions,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if summary.total_sessions == 0 {
        println!("No sessions yet ({}). Run `mathdrill practice` to start.", args.window.as_str());
        return Ok(());
    }

    println!("Progress ({})\n", args.window.as_str());
    println!("  Sessions:        {}", summary.total_sessions);
    println!(
        "  Problems:        {} ({} correct)",
        summary.problems_solved, summary.correct_answers
    );
    println!("  Accuracy:        {:.1}%", summary.accuracy);
    println!("  Mastery score:   {:.1}", summary.mastery_score);
    println!("  Time practiced:  {}", format_duration(summary.total_time));
    if let Some(avg) = summary.average_time_per_problem {
        println!("  Avg per problem: {:.1}s", avg);
    }

    if !summary.by_operation.is_empty() {
        println!("\nBy operation:");
        for row in &summary.by_operation {
            println!(
                "  {:<15} {:>4} sessions {:>6} problems {:>6.1}%",
                row.operation.label(),
                row.sessions,
                row.problems_solved,
                row.accuracy
            );
        }
    }

    if !progress.is_empty() {
        println!("\nBuckets (all time):");
        for bucket in &progress {
            let mastered = if is_mastered(bucket.problems_solved, bucket.correct_answers) {
                " mastered"
            } else {
                ""
            };
            println!(
                "  {:<15} {:<12} {:>6} problems {:>6.1}% streak {}{}",
                bucket.operation.label(),
                bucket.difficulty.as_str(),
                bucket.problems_solved,
                bucket.accuracy(),
                bucket.current_streak,
                mastered
            );
        }
    }

    if !sessions.is_empty() {
        println!("\nRecent sessions:");
        for session in &sessions {
            println!(
                "  {}  {:<8} {:<15} {:>3}/{:<3} {:>5.1}%",
                session.completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                session.mode.as_str(),
                session.operation.label(),
                session.correct_answers,
                session.problems_solved,
                session.accuracy
            );
        }
    }

    Ok(())
}

fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}h {}m", h, m)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
