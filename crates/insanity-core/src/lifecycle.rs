//! Run-level state machine.
//!
//! Enforces the strictly sequential `Idle → Setup → Started → Setup → … → Idle`
//! ordering. [`RunLevelMachine`] is a pure synchronous data structure with no
//! callbacks; [`crate::test::Test`] wraps it in the run-state mutex and calls
//! user code between [`RunLevelMachine::begin`] and
//! [`RunLevelMachine::commit`] / [`RunLevelMachine::abort`].
//!
//! Setup and start move the run-level to their target *before* the user
//! callback runs, so a start callback already observes `Started` (and may
//! resolve non-global output files). Stop and teardown keep the current level
//! until the callback returns. A transition in flight blocks every other
//! transition until it is committed or aborted.

use std::fmt;

use thiserror::Error;

use crate::arguments::ArgumentError;

/// The lifecycle state of one test instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunLevel {
    #[default]
    Idle,
    Setup,
    Started,
}

impl fmt::Display for RunLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Setup => "setup",
            Self::Started => "started",
        };
        f.write_str(s)
    }
}

/// A lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Setup,
    Start,
    Stop,
    Teardown,
}

impl Operation {
    /// The run-level this operation must start from.
    pub fn required(self) -> RunLevel {
        match self {
            Self::Setup => RunLevel::Idle,
            Self::Start => RunLevel::Setup,
            Self::Stop => RunLevel::Started,
            Self::Teardown => RunLevel::Setup,
        }
    }

    /// The run-level reached when the operation commits.
    pub fn target(self) -> RunLevel {
        match self {
            Self::Setup => RunLevel::Setup,
            Self::Start => RunLevel::Started,
            Self::Stop => RunLevel::Setup,
            Self::Teardown => RunLevel::Idle,
        }
    }

    fn enters_early(self) -> bool {
        matches!(self, Self::Setup | Self::Start)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Setup => "setup",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Teardown => "teardown",
        };
        f.write_str(s)
    }
}

/// Why a transition did not happen.
#[derive(Error, Debug)]
pub enum TransitionError {
    /// Called from the wrong run-level; nothing changed
    #[error("cannot {op} while {level}")]
    WrongState { op: Operation, level: RunLevel },

    /// Another transition is still in flight
    #[error("cannot {op}: {in_flight} is in progress")]
    Busy { op: Operation, in_flight: Operation },

    /// Supplied argument batch rejected as a whole
    #[error("{op} rejected: {source}")]
    Rejected {
        op: Operation,
        #[source]
        source: ArgumentError,
    },

    /// The user callback reported failure
    #[error("{op} callback failed: {source}")]
    CallbackFailed {
        op: Operation,
        #[source]
        source: anyhow::Error,
    },

    /// The previous worker has not finished yet
    #[error("a test worker from the previous iteration is still running")]
    AlreadyRunning,

    /// The worker thread could not be spawned
    #[error("failed to spawn test worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Pure run-level bookkeeping.
#[derive(Debug, Default)]
pub struct RunLevelMachine {
    level: RunLevel,
    in_flight: Option<Operation>,
    iteration: u32,
}

impl RunLevelMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> RunLevel {
        self.level
    }

    /// Completed start/stop cycles since the last setup.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    /// Check that `op` may run now and mark it in flight.
    ///
    /// On success returns the level the machine was in, to hand back to
    /// [`Self::abort`] if the callback fails.
    pub fn begin(&mut self, op: Operation) -> Result<RunLevel, TransitionError> {
        if let Some(in_flight) = self.in_flight {
            return Err(TransitionError::Busy { op, in_flight });
        }
        if self.level != op.required() {
            return Err(TransitionError::WrongState {
                op,
                level: self.level,
            });
        }
        let previous = self.level;
        self.in_flight = Some(op);
        if op.enters_early() {
            self.level = op.target();
        }
        if op == Operation::Setup {
            self.iteration = 0;
        }
        Ok(previous)
    }

    /// Finish `op`, moving to its target level.
    pub fn commit(&mut self, op: Operation) {
        debug_assert_eq!(self.in_flight, Some(op));
        self.in_flight = None;
        self.level = op.target();
        if op == Operation::Stop {
            self.iteration += 1;
        }
    }

    /// Roll `op` back to `previous` without side effects.
    pub fn abort(&mut self, op: Operation, previous: RunLevel) {
        debug_assert_eq!(self.in_flight, Some(op));
        self.in_flight = None;
        self.level = previous;
    }
}
