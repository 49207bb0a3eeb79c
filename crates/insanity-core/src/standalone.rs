//! Self-driven runs: `setup → start → wait → stop → teardown`, then a report.

use std::collections::BTreeMap;
use std::fmt;

use crate::arguments::CallArgs;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::signals::SignalSink;
use crate::test::Test;
use crate::watchdog::WaitOutcome;

/// Final verdict for one checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Pass,
    Fail,
    /// Never validated; counts as a failure
    Skip,
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        })
    }
}

/// Summary of a standalone run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcomes: BTreeMap<String, ItemOutcome>,
    pub failed: usize,
    pub total: usize,
    pub timed_out: bool,
    /// Watchdog period in seconds, when one was armed
    pub timeout_secs: Option<u64>,
}

impl RunReport {
    fn collect(test: &Test) -> Self {
        let results = test.checklist_results();
        let outcomes: BTreeMap<_, _> = test
            .registry()
            .checklist_items()
            .map(|item| {
                let outcome = match results.get(&item.label) {
                    Some(true) => ItemOutcome::Pass,
                    Some(false) => ItemOutcome::Fail,
                    None => ItemOutcome::Skip,
                };
                (item.label.clone(), outcome)
            })
            .collect();
        let failed = outcomes.values().filter(|o| **o != ItemOutcome::Pass).count();
        Self {
            total: outcomes.len(),
            outcomes,
            failed,
            timed_out: test.timed_out(),
            timeout_secs: test.watchdog_period().map(|d| d.as_secs()),
        }
    }

    pub fn passed(&self) -> bool {
        self.failed == 0 && !self.timed_out
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, outcome) in &self.outcomes {
            writeln!(f, "{label}: {outcome}")?;
        }
        if self.timed_out {
            writeln!(f, "timeout: no progress for {}s", self.timeout_secs.unwrap_or(0))?;
        }
        write!(f, "{}/{} failed tests", self.failed, self.total)
    }
}

impl Test {
    /// Drive one complete run without a controller.
    ///
    /// `pairs` are command-line `label=value` strings. Validations and extra
    /// info go to `sink` as they happen.
    ///
    /// # Errors
    ///
    /// Only for a command-line value that does not convert to its declared
    /// type. Callback failures and timeouts are reported in the
    /// [`RunReport`].
    pub fn run_standalone<S: AsRef<str>>(
        &self,
        pairs: &[S],
        config: &HarnessConfig,
        sink: Box<dyn SignalSink>,
    ) -> Result<RunReport, HarnessError> {
        self.configure(config, true, sink);
        let args = CallArgs::from_cli(self.registry(), pairs)?;

        if let Err(e) = self.do_setup(&args) {
            tracing::error!(error = %e, "standalone setup failed");
            return Ok(RunReport::collect(self));
        }
        match self.do_start(&args) {
            Ok(()) => {
                if self.wait_done() == WaitOutcome::TimedOut {
                    tracing::warn!("standalone run timed out");
                }
                if let Err(e) = self.do_stop() {
                    tracing::error!(error = %e, "standalone stop failed");
                }
            }
            Err(e) => tracing::error!(error = %e, "standalone start failed"),
        }
        if let Err(e) = self.do_teardown() {
            tracing::error!(error = %e, "standalone teardown failed");
        }
        Ok(RunReport::collect(self))
    }
}
