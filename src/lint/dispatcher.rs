//! Debounce state machine deciding when a mutation becomes a lint request.
//!
//! ```text
//! Idle ──mutation──▶ PendingEdit ──quiet period──▶ Dispatched ──sent──▶ Idle
//!                      ▲      │
//!                      └──────┘ mutation restarts the timer
//! ```
//!
//! Mutations during composition input are observed but never start or
//! restart the timer; dispatch waits for the composition to end. `Disabled`
//! is terminal.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// An edit is waiting for the quiet period (or for composition to end).
    PendingEdit,
    /// The quiet period elapsed and a request is being sent. A session
    /// moves on to `Idle` in the same step, so `SessionHandle::state` never
    /// reports it.
    Dispatched,
    /// The worker is gone; no further requests are sent.
    Disabled,
}

/// Result of a timer expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Send a lint request now.
    Fire,
    /// Composition is in progress; wait for it to end.
    Deferred,
    /// The deadline has not been reached.
    NotDue,
    /// Nothing is pending.
    Idle,
}

#[derive(Debug)]
pub struct Dispatcher {
    state: DispatchState,
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Dispatcher {
    pub fn new(quiet: Duration) -> Self {
        Self {
            state: DispatchState::Idle,
            quiet,
            deadline: None,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// When the quiet period ends, if a timer is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_disabled(&self) -> bool {
        self.state == DispatchState::Disabled
    }

    /// A committed document mutation.
    pub fn on_mutation(&mut self, now: Instant, composing: bool) {
        if self.is_disabled() {
            return;
        }
        self.state = DispatchState::PendingEdit;
        self.deadline = if composing {
            None
        } else {
            Some(now + self.quiet)
        };
    }

    /// Composition input finished; start the quiet period for deferred edits.
    pub fn on_composition_end(&mut self, now: Instant) {
        if self.state == DispatchState::PendingEdit && self.deadline.is_none() {
            self.deadline = Some(now + self.quiet);
        }
    }

    pub fn on_timer(&mut self, now: Instant, composing: bool) -> TimerOutcome {
        if self.state != DispatchState::PendingEdit {
            return TimerOutcome::Idle;
        }
        match self.deadline {
            None => TimerOutcome::Deferred,
            Some(deadline) if now < deadline => TimerOutcome::NotDue,
            Some(_) if composing => {
                self.deadline = None;
                TimerOutcome::Deferred
            }
            Some(_) => {
                self.deadline = None;
                self.state = DispatchState::Dispatched;
                TimerOutcome::Fire
            }
        }
    }

    /// The request for the last `Fire` has been handed off (or skipped).
    pub fn finish_dispatch(&mut self) {
        if self.state == DispatchState::Dispatched {
            self.state = DispatchState::Idle;
        }
    }

    pub fn disable(&mut self) {
        self.state = DispatchState::Disabled;
        self.deadline = None;
    }
}
