//! How the start-phase test body is executed.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::lifecycle::TransitionError;
use crate::test::Test;

/// The long-running body of a threaded test.
pub type TestBody = Arc<dyn Fn(&Test) + Send + Sync>;

/// Selected once, when the test is built.
#[derive(Clone, Default)]
pub enum Execution {
    /// The start callback runs on the control-loop thread and must arrange
    /// for `done` itself.
    #[default]
    Direct,
    /// Each start spawns one worker running the body while the control loop
    /// keeps serving stop and timeouts.
    Threaded(TestBody),
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("Direct"),
            Self::Threaded(_) => f.write_str("Threaded(..)"),
        }
    }
}

/// Holds at most one worker thread.
#[derive(Debug, Default)]
pub struct WorkerSlot {
    handle: Option<JoinHandle<()>>,
}

impl WorkerSlot {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Join a worker that has already returned.
    pub fn reap(&mut self) {
        if self.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = self.handle.take() {
                if handle.join().is_err() {
                    tracing::error!("test worker panicked");
                }
            }
        }
    }

    /// Refuse if the previous worker is still running.
    pub fn ensure_idle(&mut self) -> Result<(), TransitionError> {
        self.reap();
        if self.is_running() {
            return Err(TransitionError::AlreadyRunning);
        }
        Ok(())
    }

    /// Run `body` on a fresh named thread.
    ///
    /// # Errors
    ///
    /// [`TransitionError::AlreadyRunning`] while a previous worker lives;
    /// [`TransitionError::Spawn`] if the OS refuses the thread.
    pub fn spawn<F>(&mut self, body: F) -> Result<(), TransitionError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_idle()?;
        let handle = thread::Builder::new()
            .name("insanity-worker".to_string())
            .spawn(body)
            .map_err(TransitionError::Spawn)?;
        self.handle = Some(handle);
        Ok(())
    }
}
