//! Real-time driver for a practice session
//!
//! Reads answers line by line, sleeps until the session's next timer and feeds
//! the elapsed wall-clock time into [`PracticeSession::elapse`]. Speech effects
//! are handed to spawned tasks so a slow TTS binary never stalls the clock.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::session::{AnswerState, PracticeSession, SessionEffect, SessionPhase};
use crate::domain::PracticeMode;
use crate::speech::Speaker;

/// Idle wake-up when no timer is pending
const IDLE_WAKE_MS: u64 = 1000;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The session reached `Complete` and can be saved
    Completed,
    /// Interrupted; nothing should be saved
    Cancelled,
}

enum Event {
    Line(Option<String>),
    Wake,
    Interrupt,
}

/// Lines typed on stdin, read on a detached thread.
///
/// The channel closes when stdin reaches end of input. The thread is never
/// joined, so a pending read does not keep the process alive.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drives a session from an input stream, writing prompts to `out`
pub struct SessionRunner<W: Write> {
    speaker: Arc<dyn Speaker>,
    rate: f32,
    out: W,
    show_audio_problems: bool,
    rendered: Option<(usize, AnswerState)>,
}

impl<W: Write> SessionRunner<W> {
    pub fn new(speaker: Arc<dyn Speaker>, rate: f32, out: W) -> Self {
        Self {
            speaker,
            rate,
            out,
            show_audio_problems: false,
            rendered: None,
        }
    }

    /// Print audio-mode problems as text too (no working speech backend)
    pub fn show_audio_problems(mut self, show: bool) -> Self {
        self.show_audio_problems = show;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until the session completes, input ends or Ctrl-C is pressed.
    ///
    /// `q` ends the session early (results are kept), `s` skips the current
    /// problem, anything else is submitted as an answer. End of input ends the
    /// session like `q`.
    pub async fn run(
        &mut self,
        session: &mut PracticeSession,
        input: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<RunOutcome> {
        let origin = Instant::now();
        let mut fed_ms: u64 = 0;

        loop {
            self.dispatch_effects(session);
            if session.phase() == SessionPhase::Complete {
                self.render_summary(session)?;
                return Ok(RunOutcome::Completed);
            }
            self.render(session)?;

            let wait = session.next_timer_in().unwrap_or(IDLE_WAKE_MS);
            let event = tokio::select! {
                line = input.recv() => Event::Line(line),
                _ = tokio::time::sleep(Duration::from_millis(wait)) => Event::Wake,
                _ = tokio::signal::ctrl_c() => Event::Interrupt,
            };

            // Timers that came due before the event fire first
            let now_ms = origin.elapsed().as_millis() as u64;
            session.elapse(now_ms.saturating_sub(fed_ms));
            fed_ms = now_ms;

            match event {
                Event::Wake => {}
                Event::Interrupt => {
                    debug!("[mathdrill:runner] Interrupted");
                    session.cancel();
                    return Ok(RunOutcome::Cancelled);
                }
                Event::Line(None) => session.end_session(),
                Event::Line(Some(line)) => self.handle_line(session, line.trim())?,
            }
        }
    }

    fn handle_line(&mut self, session: &mut PracticeSession, line: &str) -> Result<()> {
        match line {
            "q" | "quit" | ":q" => session.end_session(),
            "s" | "skip" | ":s" => session.skip(),
            "" => {}
            answer => {
                if let Some(correct) = session.submit_answer(answer) {
                    let mark = if correct { "✓" } else { "✗" };
                    let feedback = session.feedback().unwrap_or_default();
                    writeln!(self.out, "  {} {}", mark, feedback)?;
                }
            }
        }
        Ok(())
    }

    fn dispatch_effects(&self, session: &mut PracticeSession) {
        for effect in session.drain_effects() {
            match effect {
                SessionEffect::Speak { cue, text } => {
                    let speaker = Arc::clone(&self.speaker);
                    let rate = self.rate;
                    tokio::spawn(async move {
                        if let Err(e) = speaker.speak(&text, rate).await {
                            warn!("[mathdrill:speech] {:?} cue not spoken: {}", cue, e);
                        }
                    });
                }
                SessionEffect::Completed => {}
            }
        }
    }

    /// Print the prompt once per problem
    fn render(&mut self, session: &PracticeSession) -> Result<()> {
        let key = (session.index(), session.answer_state());
        if self.rendered == Some(key) || session.answer_state() != AnswerState::Pending {
            return Ok(());
        }
        self.rendered = Some(key);

        let Some(problem) = session.current_problem() else {
            return Ok(());
        };
        let position = format!("[{}/{}]", session.index() + 1, session.problems().len());
        let clock = session
            .time_remaining()
            .map(|r| format!(" ({}s left)", r))
            .unwrap_or_default();

        if session.mode() == PracticeMode::Audio && !self.show_audio_problems {
            writeln!(self.out, "{}{} Listen...", position, clock)?;
        } else {
            writeln!(self.out, "{}{} {} = ?", position, clock, problem.display_expression)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn render_summary(&mut self, session: &PracticeSession) -> Result<()> {
        writeln!(
            self.out,
            "Done: {}/{} correct, score {}, {}s",
            session.correct_answers(),
            session.problems_solved(),
            session.score(),
            session.time_elapsed()
        )?;
        Ok(())
    }
}
