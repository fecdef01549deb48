#![forbid(unsafe_code)]

//! Cancellable one-shot timers on a virtual clock.
//!
//! [`TimerQueue`] never reads wall-clock time. The owner advances it
//! explicitly, which keeps every run reproducible: a live shell feeds real
//! elapsed time, tests feed whatever durations they like.
//!
//! # Ownership
//!
//! [`TimerQueue::schedule`] returns a [`TimerHandle`]. The handle is the only
//! way to keep a timer alive: dropping it cancels the timer, so a component
//! that is torn down or replaced cannot be called back afterwards.
//!
//! # Invariants
//!
//! 1. A cancelled timer never fires.
//! 2. Due timers fire in `(deadline, scheduling order)` order.
//! 3. The clock never moves backwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Identifier assigned to each scheduled timer.
pub type TimerId = u64;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Lifecycle of a single timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Scheduled and not yet due.
    Pending,
    /// Delivered to the owner.
    Fired,
    /// Cancelled before it could fire.
    Cancelled,
}

/// Owner's side of a scheduled timer. Cancels the timer when dropped.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    deadline: Duration,
    state: Arc<AtomicU8>,
}

impl TimerHandle {
    /// Identifier of the underlying timer.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Virtual time at which the timer is due.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Cancel the timer. Has no effect once it has fired.
    pub fn cancel(&self) {
        let _ = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Current state of the timer.
    pub fn state(&self) -> TimerState {
        match self.state.load(Ordering::Acquire) {
            PENDING => TimerState::Pending,
            FIRED => TimerState::Fired,
            _ => TimerState::Cancelled,
        }
    }

    /// Whether the timer is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.state() == TimerState::Pending
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A timer delivered by [`TimerQueue::pop_due`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    /// Identifier of the timer that fired.
    pub id: TimerId,
    /// Virtual time at which it fired.
    pub at: Duration,
    /// Payload supplied at scheduling time.
    pub payload: T,
}

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    deadline: Duration,
    payload: T,
    state: Arc<AtomicU8>,
}

impl<T> Entry<T> {
    fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }
}

/// Deterministic one-shot timer queue.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now: Duration,
    next_id: TimerId,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue with the clock at zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            entries: Vec::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire `delay` after the current time.
    #[must_use = "dropping the handle cancels the timer"]
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let deadline = self.now + delay;
        let state = Arc::new(AtomicU8::new(PENDING));
        tracing::trace!(timer_id = id, deadline_ms = deadline.as_millis() as u64, "timer scheduled");
        self.entries.push(Entry {
            id,
            deadline,
            payload,
            state: Arc::clone(&state),
        });
        TimerHandle { id, deadline, state }
    }

    /// Pop the earliest live timer due at or before `until`.
    ///
    /// The clock moves to the timer's deadline, so anything the caller
    /// schedules while handling it is relative to the moment it fired.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<T>> {
        self.entries.retain(Entry::is_pending);
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= until)
            .min_by_key(|(_, e)| (e.deadline, e.id))
            .map(|(idx, _)| idx)?;
        let entry = self.entries.remove(idx);
        entry.state.store(FIRED, Ordering::Release);
        self.now = self.now.max(entry.deadline);
        tracing::trace!(timer_id = entry.id, at_ms = self.now.as_millis() as u64, "timer fired");
        Some(Fired {
            id: entry.id,
            at: self.now,
            payload: entry.payload,
        })
    }

    /// Move the clock forward to `until` without firing anything.
    ///
    /// Call after draining [`pop_due`](Self::pop_due) for the same target.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Number of timers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Deadline of the next live timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries
            .iter()
            .filter(|e| e.is_pending())
            .map(|e| e.deadline)
            .min()
    }

    /// Cancel every pending timer.
    pub fn cancel_all(&mut self) {
        for entry in self.entries.drain(..) {
            let _ = entry
                .state
                .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
        }
    }
}
