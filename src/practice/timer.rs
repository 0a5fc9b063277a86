//! Cancellable timers on a virtual millisecond clock
//!
//! The session state machine never sleeps. It schedules timers here and the
//! driver feeds elapsed time in with [`TimerQueue::advance`], which returns the
//! timers that came due in deadline order. Every scheduled timer has a
//! [`TimerHandle`]; cancelling it guarantees the timer never fires.

/// Kinds of delayed transitions a session schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-second session clock
    Clock,
    /// Move to the next problem after feedback was shown
    AutoAdvance,
    /// Read the current problem aloud (audio mode)
    Dictation,
}

/// Handle returned by [`TimerQueue::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    kind: TimerKind,
    due_at: u64,
}

/// A timer that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub due_at: u64,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    now: u64,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u64) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(PendingTimer {
            handle,
            kind,
            due_at: self.now + delay_ms,
        });
        handle
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Milliseconds until the earliest pending timer
    pub fn next_deadline_in(&self) -> Option<u64> {
        self.pending
            .iter()
            .map(|t| t.due_at.saturating_sub(self.now))
            .min()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to its deadline.
    ///
    /// Callers that schedule new timers while handling a fired one should loop on this
    /// rather than [`advance`](Self::advance), so that follow-up timers due inside the
    /// same window fire in order.
    pub fn pop_due(&mut self, until: u64) -> Option<FiredTimer> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_at <= until)
            .min_by_key(|(_, t)| (t.due_at, t.handle.0))
            .map(|(i, _)| i)?;
        let timer = self.pending.remove(idx);
        self.now = self.now.max(timer.due_at);
        Some(FiredTimer {
            handle: timer.handle,
            kind: timer.kind,
            due_at: timer.due_at,
        })
    }

    /// Move the clock forward by `elapsed_ms`, returning every timer that came due
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<FiredTimer> {
        let until = self.now + elapsed_ms;
        let mut fired = Vec::new();
        while let Some(timer) = self.pop_due(until) {
            fired.push(timer);
        }
        self.now = until;
        fired
    }

    /// Set the clock without firing anything (used after draining with `pop_due`)
    pub fn settle(&mut self, now: u64) {
        self.now = self.now.max(now);
    }
}
