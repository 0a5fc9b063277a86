//! Practice session state machine
//!
//! `Idle -> Running -> Complete`. While running, the session tracks the current
//! problem index and whether the answer to that problem is still pending or
//! already shown. Time only moves through [`PracticeSession::elapse`], which
//! fires the clock, auto-advance and dictation timers held in a [`TimerQueue`].
//!
//! Side effects the session cannot perform itself (speech) are queued as
//! [`SessionEffect`]s and drained by the driver.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::generator;
use super::timer::{FiredTimer, TimerHandle, TimerKind, TimerQueue};
use super::validator::{check_answer, parse_answer};
use crate::domain::{format_number, MathProblem, PracticeMode, ProblemConfig};
use crate::error::{PracticeError, PracticeResult};
use crate::speech;
use crate::stats::achievements::Achievement;
use crate::stats::{PracticeSessionRecord, ProgressStore};

/// Points added to the score for each correct answer
pub const POINTS_PER_CORRECT: u32 = 10;

/// Delays for the session's scheduled transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub tick_ms: u64,
    /// Feedback display time before moving on
    pub advance_delay_ms: u64,
    /// Longer delay in audio mode so spoken feedback can finish
    pub audio_advance_delay_ms: u64,
    /// Pause before a problem is read aloud
    pub dictation_delay_ms: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            advance_delay_ms: 1500,
            audio_advance_delay_ms: 2000,
            dictation_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Complete,
}

/// Sub-state of the current problem while running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    Pending,
    Shown { is_correct: bool },
}

/// What a queued speech request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCue {
    Problem,
    Feedback,
}

/// Work the driver has to carry out on behalf of the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    Speak { cue: SpeechCue, text: String },
    Completed,
}

/// Result of a successful `save_results`
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub record: PracticeSessionRecord,
    pub newly_unlocked: Vec<Achievement>,
}

/// Parameters for [`PracticeSession::start`]
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub config: ProblemConfig,
    pub mode: PracticeMode,
    pub session_length: usize,
    /// Seconds; only used in timed mode
    pub time_limit: u32,
}

#[derive(Debug)]
pub struct PracticeSession {
    phase: SessionPhase,
    mode: PracticeMode,
    config: Option<ProblemConfig>,
    timing: SessionTiming,
    voice_feedback: bool,

    problems: Vec<MathProblem>,
    index: usize,
    answer_state: AnswerState,
    user_answer: Option<String>,
    feedback: Option<String>,

    score: u32,
    correct_answers: u32,
    time_elapsed: u32,
    time_remaining: Option<u32>,

    timers: TimerQueue,
    clock_timer: Option<TimerHandle>,
    advance_timer: Option<TimerHandle>,
    dictation_timer: Option<TimerHandle>,
    effects: Vec<SessionEffect>,

    /// Computed once on the first save attempt so a failed save can be retried
    results: Option<PracticeSessionRecord>,
    saved: bool,
}

impl Default for PracticeSession {
    fn default() -> Self {
        Self::new(SessionTiming::default())
    }
}

impl PracticeSession {
    pub fn new(timing: SessionTiming) -> Self {
        Self {
            phase: SessionPhase::Idle,
            mode: PracticeMode::default(),
            config: None,
            timing,
            voice_feedback: true,
            problems: Vec::new(),
            index: 0,
            answer_state: AnswerState::Pending,
            user_answer: None,
            feedback: None,
            score: 0,
            correct_answers: 0,
            time_elapsed: 0,
            time_remaining: None,
            timers: TimerQueue::new(),
            clock_timer: None,
            advance_timer: None,
            dictation_timer: None,
            effects: Vec::new(),
            results: None,
            saved: false,
        }
    }

    /// Whether spoken feedback is emitted after answers in audio mode
    pub fn with_voice_feedback(mut self, enabled: bool) -> Self {
        self.voice_feedback = enabled;
        self
    }

    // ========================================
    // TRANSITIONS
    // ========================================

    /// Generate every problem of the session and start the clock
    pub fn start(&mut self, params: SessionParams) -> PracticeResult<()> {
        if self.phase == SessionPhase::Running {
            return Err(PracticeError::invalid_state("a session is already running"));
        }
        if params.session_length == 0 {
            return Err(PracticeError::invalid_config(
                "session length must be at least one problem",
            ));
        }
        if params.mode == PracticeMode::Timed && params.time_limit == 0 {
            return Err(PracticeError::invalid_config(
                "timed sessions need a time limit above zero",
            ));
        }

        // Generation failures leave the session untouched
        let problems = generator::generate_batch(&params.config, params.session_length)?;
        self.begin(params, problems);
        Ok(())
    }

    /// Start with problems generated elsewhere (replays, tests)
    pub fn start_with_problems(
        &mut self,
        params: SessionParams,
        problems: Vec<MathProblem>,
    ) -> PracticeResult<()> {
        if self.phase == SessionPhase::Running {
            return Err(PracticeError::invalid_state("a session is already running"));
        }
        if problems.is_empty() {
            return Err(PracticeError::invalid_config(
                "session length must be at least one problem",
            ));
        }
        if params.mode == PracticeMode::Timed && params.time_limit == 0 {
            return Err(PracticeError::invalid_config(
                "timed sessions need a time limit above zero",
            ));
        }
        self.begin(params, problems);
        Ok(())
    }

    fn begin(&mut self, params: SessionParams, problems: Vec<MathProblem>) {
        let timing = self.timing;
        let voice_feedback = self.voice_feedback;
        *self = Self::new(timing).with_voice_feedback(voice_feedback);

        self.mode = params.mode;
        self.time_remaining = (params.mode == PracticeMode::Timed).then_some(params.time_limit);
        self.config = Some(params.config);
        self.problems = problems;
        self.phase = SessionPhase::Running;
        self.clock_timer = Some(self.timers.schedule(TimerKind::Clock, self.timing.tick_ms));
        if self.mode == PracticeMode::Audio {
            self.schedule_dictation();
        }

        info!(
            "[mathdrill:session] Started {} session with {} problems",
            self.mode,
            self.problems.len()
        );
    }

    /// Move virtual time forward, firing any timers that come due
    pub fn elapse(&mut self, elapsed_ms: u64) {
        let until = self.timers.now() + elapsed_ms;
        while let Some(fired) = self.timers.pop_due(until) {
            self.on_timer(fired);
        }
        self.timers.settle(until);
    }

    fn on_timer(&mut self, fired: FiredTimer) {
        match fired.kind {
            TimerKind::Clock => {
                self.clock_timer = None;
                self.tick();
            }
            TimerKind::AutoAdvance => {
                self.advance_timer = None;
                self.advance();
            }
            TimerKind::Dictation => {
                self.dictation_timer = None;
                if let Some(problem) = self.current_problem() {
                    let text = speech::problem_prompt(problem);
                    self.effects.push(SessionEffect::Speak {
                        cue: SpeechCue::Problem,
                        text,
                    });
                }
            }
        }
    }

    fn tick(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.time_elapsed += 1;

        if let Some(remaining) = self.time_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                debug!("[mathdrill:session] Time is up");
                self.complete();
                return;
            }
        }

        self.clock_timer = Some(self.timers.schedule(TimerKind::Clock, self.timing.tick_ms));
    }

    /// Submit an answer for the current problem.
    ///
    /// Returns `None` when there is nothing to answer (not running, no current
    /// problem, or the answer is already shown). Non-numeric input counts as wrong.
    pub fn submit_answer(&mut self, text: &str) -> Option<bool> {
        if self.phase != SessionPhase::Running || self.answer_state != AnswerState::Pending {
            return None;
        }
        let expected = self.current_problem()?.answer;

        let parsed = parse_answer(text);
        let is_correct = parsed.is_some_and(|value| check_answer(value, expected));
        let feedback = match (parsed, is_correct) {
            (_, true) => "Correct!".to_string(),
            (Some(_), false) => format!("Incorrect. The answer is {}", format_number(expected)),
            (None, false) => format!("Not a number. The answer is {}", format_number(expected)),
        };

        if is_correct {
            self.correct_answers += 1;
            self.score += POINTS_PER_CORRECT;
        }
        self.user_answer = Some(text.to_string());
        self.answer_state = AnswerState::Shown { is_correct };
        self.feedback = Some(feedback.clone());

        debug!(
            "[mathdrill:session] Problem {} answered: correct={}",
            self.index + 1,
            is_correct
        );

        let delay = if self.mode == PracticeMode::Audio {
            if self.voice_feedback {
                self.effects.push(SessionEffect::Speak {
                    cue: SpeechCue::Feedback,
                    text: feedback,
                });
            }
            self.timing.audio_advance_delay_ms
        } else {
            self.timing.advance_delay_ms
        };
        self.advance_timer = Some(self.timers.schedule(TimerKind::AutoAdvance, delay));

        Some(is_correct)
    }

    /// Skip to the next problem without waiting for the auto-advance
    pub fn skip(&mut self) {
        self.advance();
    }

    fn advance(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        if let Some(handle) = self.advance_timer.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.dictation_timer.take() {
            self.timers.cancel(handle);
        }

        self.index += 1;
        self.answer_state = AnswerState::Pending;
        self.user_answer = None;
        self.feedback = None;

        if self.index >= self.problems.len() {
            self.index = self.problems.len();
            self.complete();
            return;
        }

        if self.mode == PracticeMode::Audio {
            self.schedule_dictation();
        }
    }

    /// Force the session to complete regardless of remaining problems or time
    pub fn end_session(&mut self) {
        if self.phase == SessionPhase::Running {
            debug!("[mathdrill:session] Ended early at problem {}", self.index + 1);
            self.complete();
        }
    }

    /// Tear the session down without persisting anything
    pub fn cancel(&mut self) {
        self.timers.cancel_all();
        self.clock_timer = None;
        self.advance_timer = None;
        self.dictation_timer = None;
        self.effects.clear();
    }

    fn schedule_dictation(&mut self) {
        self.dictation_timer = Some(
            self.timers
                .schedule(TimerKind::Dictation, self.timing.dictation_delay_ms),
        );
    }

    fn complete(&mut self) {
        self.timers.cancel_all();
        self.clock_timer = None;
        self.advance_timer = None;
        self.dictation_timer = None;
        self.phase = SessionPhase::Complete;
        self.effects.push(SessionEffect::Completed);

        info!(
            "[mathdrill:session] Complete: {}/{} correct in {}s",
            self.correct_answers,
            self.problems_solved(),
            self.time_elapsed
        );
    }

    // ========================================
    // RESULTS
    // ========================================

    /// Problems reached so far. A problem whose answer is shown but not yet
    /// advanced past counts as solved.
    pub fn problems_solved(&self) -> u32 {
        let reached = self.index.min(self.problems.len());
        let answered_tail = matches!(self.answer_state, AnswerState::Shown { .. })
            && self.index < self.problems.len();
        (reached + answered_tail as usize) as u32
    }

    /// Build the summary record. Only valid once the session is complete.
    pub fn compute_results(&self, completed_at: DateTime<Utc>) -> PracticeResult<PracticeSessionRecord> {
        if self.phase != SessionPhase::Complete {
            return Err(PracticeError::invalid_state(
                "results are only available once the session is complete",
            ));
        }
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| PracticeError::invalid_state("session was never started"))?;

        let problems_solved = self.problems_solved();
        let denominator = problems_solved.max(1) as f64;

        Ok(PracticeSessionRecord {
            id: Uuid::new_v4().to_string(),
            mode: self.mode,
            operation: config.operation,
            difficulty: config.difficulty,
            problems_solved,
            correct_answers: self.correct_answers,
            session_time: self.time_elapsed,
            accuracy: self.correct_answers as f64 / denominator * 100.0,
            avg_time_per_problem: Some(self.time_elapsed as f64 / denominator),
            completed_at,
        })
    }

    /// Persist the results, update the progress bucket and evaluate achievements
    pub fn save_results(&mut self, store: &ProgressStore) -> PracticeResult<SessionOutcome> {
        self.save_results_at(store, Utc::now())
    }

    pub fn save_results_at(
        &mut self,
        store: &ProgressStore,
        now: DateTime<Utc>,
    ) -> PracticeResult<SessionOutcome> {
        if self.saved {
            return Err(PracticeError::invalid_state("results were already saved"));
        }
        let record = match &self.results {
            Some(record) => record.clone(),
            None => {
                let record = self.compute_results(now)?;
                self.results = Some(record.clone());
                record
            }
        };

        store
            .recorder()
            .record_session(&record, now)
            .map_err(PracticeError::StorageFailure)?;
        let newly_unlocked = store
            .achievements()
            .check(Some(&record), now)
            .map_err(PracticeError::StorageFailure)?;

        self.saved = true;
        Ok(SessionOutcome {
            record,
            newly_unlocked,
        })
    }

    // ========================================
    // ACCESSORS
    // ========================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    pub fn current_problem(&self) -> Option<&MathProblem> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        self.problems.get(self.index)
    }

    pub fn problems(&self) -> &[MathProblem] {
        &self.problems
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn answer_state(&self) -> AnswerState {
        self.answer_state
    }

    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    pub fn time_elapsed(&self) -> u32 {
        self.time_elapsed
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.time_remaining
    }

    /// Results computed by the last save attempt, if any
    pub fn results(&self) -> Option<&PracticeSessionRecord> {
        self.results.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Milliseconds until the next scheduled transition
    pub fn next_timer_in(&self) -> Option<u64> {
        self.timers.next_deadline_in()
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn drain_effects(&mut self) -> Vec<SessionEffect> {
        std::mem::take(&mut self.effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Operation};

    fn params(mode: PracticeMode, length: usize, time_limit: u32) -> SessionParams {
        SessionParams {
            config: ProblemConfig::new(Operation::Addition, Difficulty::Beginner),
            mode,
            session_length: length,
            time_limit,
        }
    }

    fn answer_of(session: &PracticeSession) -> String {
        format_number(session.current_problem().unwrap().answer)
    }

    #[test]
    fn test_start_generates_all_problems() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 5, 0)).unwrap();
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.problems().len(), 5);
        assert_eq!(session.time_remaining(), None);
        assert!(session.current_problem().is_some());
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let mut session = PracticeSession::default();
        let err = session.start(params(PracticeMode::Accuracy, 0, 0)).unwrap_err();
        assert!(matches!(err, PracticeError::InvalidConfiguration(_)));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_timed_without_limit_is_rejected() {
        let mut session = PracticeSession::default();
        let err = session.start(params(PracticeMode::Timed, 5, 0)).unwrap_err();
        assert!(matches!(err, PracticeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_correct_answer_then_auto_advance() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 3, 0)).unwrap();

        let answer = answer_of(&session);
        assert_eq!(session.submit_answer(&answer), Some(true));
        assert_eq!(session.correct_answers(), 1);
        assert_eq!(session.score(), POINTS_PER_CORRECT);
        assert_eq!(session.feedback(), Some("Correct!"));
        assert_eq!(session.answer_state(), AnswerState::Shown { is_correct: true });

        // Second submission while feedback is shown is ignored
        assert_eq!(session.submit_answer(&answer), None);

        session.elapse(1499);
        assert_eq!(session.index(), 0);
        session.elapse(1);
        assert_eq!(session.index(), 1);
        assert_eq!(session.answer_state(), AnswerState::Pending);
        assert_eq!(session.feedback(), None);
        assert_eq!(session.time_elapsed(), 1);
    }

    #[test]
    fn test_malformed_answer_counts_as_wrong() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 2, 0)).unwrap();
        assert_eq!(session.submit_answer("twelve"), Some(false));
        assert_eq!(session.correct_answers(), 0);
        assert!(session.feedback().unwrap().starts_with("Not a number"));
    }

    #[test]
    fn test_submit_when_idle_is_noop() {
        let mut session = PracticeSession::default();
        assert_eq!(session.submit_answer("3"), None);
    }

    #[test]
    fn test_skip_past_last_problem_completes() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 2, 0)).unwrap();
        session.skip();
        session.skip();
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(session.current_problem().is_none());
        assert_eq!(session.problems_solved(), 2);
        assert!(!session.has_pending_timers());
        assert!(session.drain_effects().contains(&SessionEffect::Completed));
    }

    #[test]
    fn test_timed_session_runs_out() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Timed, 50, 3)).unwrap();
        assert_eq!(session.time_remaining(), Some(3));
        session.elapse(2000);
        assert_eq!(session.time_remaining(), Some(1));
        assert_eq!(session.phase(), SessionPhase::Running);
        session.elapse(1000);
        assert_eq!(session.time_remaining(), Some(0));
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert_eq!(session.time_elapsed(), 3);

        // Clock stays stopped
        session.elapse(5000);
        assert_eq!(session.time_elapsed(), 3);
    }

    #[test]
    fn test_timeout_does_not_submit_pending_answer() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Timed, 10, 1)).unwrap();
        session.elapse(1000);
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert_eq!(session.problems_solved(), 0);
        assert_eq!(session.correct_answers(), 0);
    }

    #[test]
    fn test_end_session_cancels_pending_advance() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 5, 0)).unwrap();
        let answer = answer_of(&session);
        session.submit_answer(&answer);
        session.end_session();
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(!session.has_pending_timers());
        session.elapse(5000);
        assert_eq!(session.index(), 0);
        // The answered-but-not-advanced problem counts
        assert_eq!(session.problems_solved(), 1);
    }

    #[test]
    fn test_results_before_complete_is_invalid_state() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 5, 0)).unwrap();
        assert!(matches!(
            session.compute_results(Utc::now()),
            Err(PracticeError::InvalidState(_))
        ));
    }

    #[test]
    fn test_immediate_end_does_not_divide_by_zero() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 5, 0)).unwrap();
        session.elapse(4000);
        session.end_session();
        let record = session.compute_results(Utc::now()).unwrap();
        assert_eq!(record.problems_solved, 0);
        assert_eq!(record.accuracy, 0.0);
        assert_eq!(record.avg_time_per_problem, Some(4.0));
    }

    #[test]
    fn test_audio_mode_dictates_and_speaks_feedback() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Audio, 2, 0)).unwrap();
        assert!(session.drain_effects().is_empty());

        session.elapse(500);
        let effects = session.drain_effects();
        assert!(matches!(
            effects.as_slice(),
            [SessionEffect::Speak { cue: SpeechCue::Problem, text }] if text.starts_with("What is")
        ));

        let answer = answer_of(&session);
        session.submit_answer(&answer);
        assert!(matches!(
            session.drain_effects().as_slice(),
            [SessionEffect::Speak { cue: SpeechCue::Feedback, .. }]
        ));

        // Audio mode waits 2s before advancing, then 500ms before dictating
        session.elapse(1500);
        assert_eq!(session.index(), 0);
        session.elapse(500);
        assert_eq!(session.index(), 1);
        assert!(session.drain_effects().is_empty());
        session.elapse(500);
        assert_eq!(session.drain_effects().len(), 1);
    }

    #[test]
    fn test_audio_without_voice_feedback() {
        let mut session = PracticeSession::default().with_voice_feedback(false);
        session.start(params(PracticeMode::Audio, 2, 0)).unwrap();
        session.elapse(500);
        session.drain_effects();
        let answer = answer_of(&session);
        session.submit_answer(&answer);
        assert!(session.drain_effects().is_empty());
    }

    #[test]
    fn test_cancel_stops_all_timers() {
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Audio, 3, 0)).unwrap();
        session.cancel();
        session.elapse(10_000);
        assert_eq!(session.time_elapsed(), 0);
        assert!(session.drain_effects().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_results_for_retry() {
        let store = ProgressStore::in_memory().unwrap();
        let mut session = PracticeSession::default();
        session.start(params(PracticeMode::Accuracy, 2, 0)).unwrap();
        let answer = answer_of(&session);
        session.submit_answer(&answer);
        session.end_session();

        store
            .db()
            .conn()
            .execute_batch("ALTER TABLE practice_sessions RENAME TO practice_sessions_away")
            .unwrap();
        let err = session.save_results(&store).unwrap_err();
        assert!(matches!(err, PracticeError::StorageFailure(_)));
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(!session.is_saved());
        let first = session.results().cloned().unwrap();

        store
            .db()
            .conn()
            .execute_batch("ALTER TABLE practice_sessions_away RENAME TO practice_sessions")
            .unwrap();
        let outcome = session.save_results(&store).unwrap();
        assert_eq!(outcome.record, first);
        assert!(session.is_saved());
        assert_eq!(store.query().recent_sessions(10).unwrap().len(), 1);

        let again = session.save_results(&store).unwrap_err();
        assert!(matches!(again, PracticeError::InvalidState(_)));
    }
}
