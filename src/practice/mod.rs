//! Practice core: problem generation, answer validation and the session state machine
//!
//! Everything here except [`runner`] is synchronous and clock-free. The runner
//! drives a [`PracticeSession`] against real time and a terminal.

pub mod generator;
pub mod runner;
mod session;
mod timer;
pub mod validator;

pub use generator::{generate, generate_batch, generate_with, MULTI_STEP_PALETTE};
pub use runner::{stdin_lines, RunOutcome, SessionRunner};
pub use session::{
    AnswerState, PracticeSession, SessionEffect, SessionOutcome, SessionParams, SessionPhase,
    SessionTiming, SpeechCue, POINTS_PER_CORRECT,
};
pub use timer::{FiredTimer, TimerHandle, TimerKind, TimerQueue};
pub use validator::{check_answer, is_correct, parse_answer, DEFAULT_TOLERANCE};
