//! Practice command implementation

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use mathdrill::domain::{Difficulty, Operation, PracticeMode, ProblemConfig};
use mathdrill::error::PracticeError;
use mathdrill::practice::{stdin_lines, PracticeSession, RunOutcome, SessionParams, SessionRunner};
use mathdrill::speech::{speech_rate, CommandSpeaker, SilentSpeaker, Speaker};

use super::AppContext;

const SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Default, Args)]
pub struct PracticeArgs {
    /// addition, subtraction, multiplication, division or percentage
    #[arg(short, long)]
    pub operation: Option<Operation>,

    /// beginner, intermediate, advanced or expert
    #[arg(short, long)]
    pub difficulty: Option<Difficulty>,

    /// timed, accuracy or audio
    #[arg(short, long)]
    pub mode: Option<PracticeMode>,

    /// Number of problems
    #[arg(short = 'n', long)]
    pub length: Option<usize>,

    /// Seconds (timed mode)
    #[arg(short, long)]
    pub time_limit: Option<u32>,

    /// Lowest operand (needs --max)
    #[arg(long, requires = "max", allow_negative_numbers = true)]
    pub min: Option<i64>,

    /// Highest operand (needs --min)
    #[arg(long, requires = "min", allow_negative_numbers = true)]
    pub max: Option<i64>,

    #[arg(long)]
    pub decimals: bool,

    #[arg(long)]
    pub negatives: bool,

    /// Chain a second operation onto each problem
    #[arg(long)]
    pub multi_step: bool,

    /// Pick a random operation per problem
    #[arg(long)]
    pub mixed: bool,

    /// Never speak, even in audio mode
    #[arg(long)]
    pub silent: bool,
}

/// Run one session in the terminal and save its results
pub async fn practice_command(ctx: &AppContext, args: PracticeArgs) -> Result<()> {
    let defaults = &ctx.config.practice;
    let mode = args.mode.unwrap_or(defaults.mode);

    let mut config = ProblemConfig::new(
        args.operation.unwrap_or(defaults.operation),
        args.difficulty.unwrap_or(defaults.difficulty),
    );
    config.include_decimals = args.decimals || defaults.include_decimals;
    config.include_negatives = args.negatives || defaults.include_negatives;
    config.multi_step = args.multi_step || defaults.multi_step;
    config.mixed_operations = args.mixed || defaults.mixed_operations;
    if let (Some(min), Some(max)) = (args.min, args.max) {
        config = config.with_range(min, max);
    }

    let store = ctx.open_store()?;
    let settings = store.query().settings()?;
    let (speaker, spoken) = pick_speaker(ctx, mode, args.silent);

    let mut session =
        PracticeSession::new(ctx.config.session_timing()).with_voice_feedback(settings.voice_feedback);
    let params = SessionParams {
        config,
        mode,
        session_length: args.length.unwrap_or(defaults.session_length),
        time_limit: args.time_limit.unwrap_or(defaults.time_limit),
    };
    let header = describe(&params);
    session.start(params)?;

    println!("{}", header);
    println!("Type an answer and press Enter. `s` skips, `q` ends the session.\n");

    let mut input = stdin_lines();
    let mut runner = SessionRunner::new(speaker, speech_rate(&settings), std::io::stdout())
        .show_audio_problems(!spoken);
    if runner.run(&mut session, &mut input).await? == RunOutcome::Cancelled {
        println!("\nSession cancelled. Nothing was saved.");
        return Ok(());
    }

    if !has_results(&session) {
        println!("Session ended before it started. Nothing was saved.");
        return Ok(());
    }

    let mut attempt = 1;
    let outcome = loop {
        match session.save_results(&store) {
            Ok(outcome) => break outcome,
            Err(PracticeError::StorageFailure(e)) if attempt < SAVE_ATTEMPTS => {
                warn!("[mathdrill:practice] Save attempt {} failed: {:#}", attempt, e);
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
            Err(e) => return Err(e.into()),
        }
    };

    let record = &outcome.record;
    println!(
        "Accuracy {:.0}%, {:.1}s per problem",
        record.accuracy,
        record.avg_time_per_problem.unwrap_or(0.0)
    );
    for achievement in &outcome.newly_unlocked {
        println!("{} Achievement unlocked: {} - {}", achievement.icon, achievement.name, achievement.description);
    }
    Ok(())
}

/// Time spent counts toward daily totals, so an unanswered session is still
/// worth saving once the clock has moved
fn has_results(session: &PracticeSession) -> bool {
    session.problems_solved() > 0 || session.time_elapsed() > 0
}

fn describe(params: &SessionParams) -> String {
    let mut text = format!(
        "{} {} - {} problems, {} mode",
        params.config.difficulty,
        params.config.operation.label(),
        params.session_length,
        params.mode
    );
    if params.mode == PracticeMode::Timed {
        text.push_str(&format!(", {}s", params.time_limit));
    }
    text
}

/// Speech is only wired up for audio sessions with a TTS binary on PATH.
/// The flag tells whether problems will actually be spoken.
fn pick_speaker(ctx: &AppContext, mode: PracticeMode, silent: bool) -> (Arc<dyn Speaker>, bool) {
    if mode != PracticeMode::Audio || silent {
        return (Arc::new(SilentSpeaker), false);
    }
    let speaker = match &ctx.config.audio.speech_command {
        Some(program) => CommandSpeaker::new(program.clone()),
        None => CommandSpeaker::default(),
    };
    if speaker.is_available() {
        (Arc::new(speaker), true)
    } else {
        warn!(
            "[mathdrill:speech] {} not found; problems are shown instead of spoken",
            speaker.program()
        );
        (Arc::new(SilentSpeaker), false)
    }
}
