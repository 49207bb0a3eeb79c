//! Done notification and liveness watchdog.
//!
//! The standalone driver blocks in [`DoneSignal::wait`] until the test calls
//! `done` or the deadline passes. Every validation, extra-info report and
//! ping pushes the deadline out again through [`DoneSignal::touch`]. The lock
//! here is independent of the run-state lock, so `done` may be signalled from
//! a worker while a transition holds the run state.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Done,
    TimedOut,
}

#[derive(Debug, Default)]
struct DoneState {
    done: bool,
    period: Option<Duration>,
    deadline: Option<Instant>,
}

fn deadline_after(period: Duration) -> Option<Instant> {
    Instant::now().checked_add(period)
}

/// Condition-variable pair guarding the done flag and the deadline.
#[derive(Debug, Default)]
pub struct DoneSignal {
    state: Mutex<DoneState>,
    cond: Condvar,
}

impl DoneSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DoneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the done flag and start a new deadline.
    ///
    /// `None` disables the watchdog: [`Self::wait`] then returns only on done.
    /// So does a period too long to be represented as a deadline.
    pub fn arm(&self, period: Option<Duration>) {
        let mut state = self.lock();
        state.done = false;
        state.period = period;
        state.deadline = period.and_then(deadline_after);
    }

    /// Mark the test finished and wake the waiter.
    pub fn notify_done(&self) {
        let mut state = self.lock();
        state.done = true;
        drop(state);
        self.cond.notify_all();
    }

    /// Push the deadline out by one period.
    pub fn touch(&self) {
        let mut state = self.lock();
        if let Some(period) = state.period {
            state.deadline = deadline_after(period);
            drop(state);
            self.cond.notify_all();
        }
    }

    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    /// Block until done or until the deadline passes with no touch.
    pub fn wait(&self) -> WaitOutcome {
        let mut state = self.lock();
        loop {
            if state.done {
                return WaitOutcome::Done;
            }
            match state.deadline {
                None => {
                    state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                    state = self
                        .cond
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}
