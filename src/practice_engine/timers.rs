//! Per-session timeouts on a virtual clock.
//!
//! Each session owns one `Timers` queue. The embedding shell feeds elapsed wall time in
//! through the session's `tick`, which drains the queue with `pop_until`; tests feed exact
//! durations. Dropping or `cancel_all`-ing the queue
//! guarantees nothing fires for a session that is gone.

use std::time::Duration;

/// Pause showing correct/incorrect before the next question.
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(1500);
/// Countdown granularity of the timed challenge.
pub const TICK: Duration = Duration::from_secs(1);
/// "Finding opponent" screen in the Arena.
pub const MATCHMAKING_DELAY: Duration = Duration::from_millis(2500);
/// Simulated ad length before a heart is granted.
pub const AD_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<E> {
    id: TimerId,
    due: Duration,
    event: E,
}

#[derive(Debug)]
pub struct Timers<E> {
    now: Duration,
    next_id: u64,
    pending: Vec<Pending<E>>,
}

impl<E> Default for Timers<E> {
    fn default() -> Self {
        Self { now: Duration::ZERO, next_id: 0, pending: Vec::new() }
    }
}

impl<E> Timers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `event` once, `after` from the current virtual time.
    pub fn schedule(&mut self, after: Duration, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending { id, due: self.now + after, event });
        id
    }

    /// Returns true if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Time until the earliest pending timer fires.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|p| p.due.saturating_sub(self.now))
            .min()
    }

    /// Virtual time `elapsed` from now; the target for `pop_until` / `settle`.
    pub fn deadline_after(&self, elapsed: Duration) -> Duration {
        self.now + elapsed
    }

    /// Pop the earliest event due at or before `deadline`, moving the clock to its due time.
    /// Equal deadlines fire in scheduling order.
    ///
    /// Sessions drain with this so a handler can cancel or reschedule timers (relative to the
    /// moment the event fired) before the next one is considered.
    pub fn pop_until(&mut self, deadline: Duration) -> Option<E> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= deadline)
            .min_by_key(|(_, p)| (p.due, p.id))
            .map(|(i, _)| i)?;
        let fired = self.pending.remove(idx);
        self.now = self.now.max(fired.due);
        Some(fired.event)
    }

    /// Finish a `pop_until` drain by moving the clock to `deadline`.
    pub fn settle(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}
