//! End-to-end session lifecycle against a real progress store

mod common;

use chrono::Utc;

use common::memory_store;
use mathdrill::domain::{format_number, Difficulty, Operation, PracticeMode, ProblemConfig};
use mathdrill::practice::{AnswerState, PracticeSession, SessionParams, SessionPhase};
use mathdrill::PracticeError;

fn params(operation: Operation, mode: PracticeMode, length: usize, time_limit: u32) -> SessionParams {
    SessionParams {
        config: ProblemConfig::new(operation, Difficulty::Beginner),
        mode,
        session_length: length,
        time_limit,
    }
}

fn current_answer(session: &PracticeSession) -> String {
    format_number(session.current_problem().unwrap().answer)
}

fn wrong_answer(session: &PracticeSession) -> String {
    format_number(session.current_problem().unwrap().answer + 1.0)
}

#[test]
fn single_correct_answer_saves_full_accuracy() {
    let store = memory_store();
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Addition, PracticeMode::Accuracy, 1, 0))
        .unwrap();

    let problem = session.current_problem().unwrap().clone();
    for operand in &problem.operands {
        assert!((1.0..=10.0).contains(operand));
    }

    let sum = problem.operands.iter().sum::<f64>();
    assert_eq!(session.submit_answer(&format_number(sum)), Some(true));
    assert_eq!(session.correct_answers(), 1);

    // Auto-advance past the only problem completes the session
    session.elapse(1500);
    assert_eq!(session.phase(), SessionPhase::Complete);
    assert!(session.current_problem().is_none());

    let now = Utc::now();
    let outcome = session.save_results_at(&store, now).unwrap();
    assert_eq!(outcome.record.problems_solved, 1);
    assert_eq!(outcome.record.accuracy, 100.0);

    // One second for one problem also clears both speed thresholds
    let unlocked: Vec<&str> = outcome.newly_unlocked.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(
        unlocked,
        ["first_steps", "sharp_shooter", "perfectionist", "quick_thinker", "lightning"]
    );

    let bucket = store
        .query()
        .bucket(Operation::Addition, Difficulty::Beginner)
        .unwrap()
        .unwrap();
    assert_eq!(bucket.problems_solved, 1);
    assert_eq!(bucket.correct_answers, 1);
    assert_eq!(bucket.current_streak, 1);
    assert_eq!(
        bucket.last_practiced.map(|t| t.timestamp_millis()),
        Some(now.timestamp_millis())
    );
}

#[test]
fn ending_early_counts_reached_problems() {
    let store = memory_store();
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Multiplication, PracticeMode::Accuracy, 20, 0))
        .unwrap();

    let a = current_answer(&session);
    session.submit_answer(&a);
    session.elapse(1500);
    let a = current_answer(&session);
    session.submit_answer(&a);
    session.elapse(1500);
    let wrong = wrong_answer(&session);
    session.submit_answer(&wrong);
    session.elapse(1500);

    assert_eq!(session.index(), 3);
    session.end_session();

    let outcome = session.save_results(&store).unwrap();
    assert_eq!(outcome.record.problems_solved, 3);
    assert_eq!(outcome.record.correct_answers, 2);
    assert!((outcome.record.accuracy - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(outcome.record.session_time, 4);
}

#[test]
fn ending_while_feedback_is_shown_counts_that_answer() {
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Addition, PracticeMode::Accuracy, 20, 0))
        .unwrap();

    for _ in 0..2 {
        let a = current_answer(&session);
        session.submit_answer(&a);
        session.elapse(1500);
    }
    let wrong = wrong_answer(&session);
    session.submit_answer(&wrong);
    assert_eq!(session.answer_state(), AnswerState::Shown { is_correct: false });

    // Ended before the auto-advance fired
    session.end_session();
    let record = session.compute_results(Utc::now()).unwrap();
    assert_eq!(record.problems_solved, 3);
    assert_eq!(record.correct_answers, 2);
}

#[test]
fn timed_session_completes_when_clock_runs_out() {
    let store = memory_store();
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Subtraction, PracticeMode::Timed, 50, 5))
        .unwrap();
    assert_eq!(session.time_remaining(), Some(5));

    let a = current_answer(&session);
    session.submit_answer(&a);
    session.elapse(4999);
    assert_eq!(session.phase(), SessionPhase::Running);
    assert_eq!(session.time_remaining(), Some(1));

    session.elapse(1);
    assert_eq!(session.phase(), SessionPhase::Complete);
    assert_eq!(session.time_remaining(), Some(0));

    let outcome = session.save_results(&store).unwrap();
    assert_eq!(outcome.record.mode, PracticeMode::Timed);
    assert_eq!(outcome.record.session_time, 5);
    assert_eq!(outcome.record.problems_solved, 1);
}

#[test]
fn zero_length_session_is_rejected() {
    let mut session = PracticeSession::default();
    let err = session
        .start(params(Operation::Addition, PracticeMode::Accuracy, 0, 0))
        .unwrap_err();
    assert!(matches!(err, PracticeError::InvalidConfiguration(_)));
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[test]
fn saving_before_complete_is_invalid_state() {
    let store = memory_store();
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Addition, PracticeMode::Accuracy, 3, 0))
        .unwrap();
    let err = session.save_results(&store).unwrap_err();
    assert!(matches!(err, PracticeError::InvalidState(_)));
    assert!(store.query().recent_sessions(10).unwrap().is_empty());
}

#[test]
fn stale_inputs_after_completion_are_ignored() {
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Addition, PracticeMode::Accuracy, 2, 0))
        .unwrap();
    session.end_session();

    assert_eq!(session.submit_answer("4"), None);
    session.skip();
    session.elapse(10_000);
    assert_eq!(session.phase(), SessionPhase::Complete);
    assert_eq!(session.time_elapsed(), 0);
    assert_eq!(session.problems_solved(), 0);
}

#[test]
fn a_new_session_can_start_after_saving() {
    let store = memory_store();
    let mut session = PracticeSession::default();
    session
        .start(params(Operation::Addition, PracticeMode::Accuracy, 1, 0))
        .unwrap();
    session.skip();
    session.save_results(&store).unwrap();

    session
        .start(params(Operation::Division, PracticeMode::Accuracy, 4, 0))
        .unwrap();
    assert_eq!(session.phase(), SessionPhase::Running);
    assert_eq!(session.problems().len(), 4);
    assert!(!session.is_saved());
    assert!(session.results().is_none());
}
