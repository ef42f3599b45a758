//! Cycle statistics and the per-tier watchdog.
//!
//! Each tier wraps its dispatch in a [`CycleStats`] measurement. The
//! counters use wrapping subtraction so a cycle counter rollover mid-run
//! still yields the right delta. An optional budget turns the statistics
//! into a watchdog: the first run that overruns it raises
//! [`EngineError::HardwareTimeout`].

use crate::error::EngineError;
use crate::platform::Platform;

/// Min/max/average cycle tracking for one measured section.
#[derive(Debug)]
pub struct CycleStats {
    label: &'static str,
    start: u32,
    last: u32,
    min: u32,
    max: u32,
    total: u64,
    runs: u32,
    budget: Option<u32>,
}

impl CycleStats {
    /// New statistics for the section called `label`.
    pub fn new(label: &'static str) -> Self {
        Self { label, start: 0, last: 0, min: u32::MAX, max: 0, total: 0, runs: 0, budget: None }
    }

    /// Arms the watchdog: any run longer than `cycles` fails.
    pub fn set_budget(&mut self, cycles: Option<u32>) {
        self.budget = cycles;
    }

    /// Marks the start of a measured run.
    pub fn begin(&mut self, platform: &dyn Platform) {
        self.start = platform.current_cycles();
    }

    /// Marks the end of a measured run and folds it into the statistics.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HardwareTimeout`] when a budget is armed and
    /// this run exceeded it.
    pub fn end(&mut self, platform: &dyn Platform) -> Result<(), EngineError> {
        let elapsed = platform.current_cycles().wrapping_sub(self.start);
        self.last = elapsed;
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
        self.total += u64::from(elapsed);
        self.runs += 1;
        if let Some(budget) = self.budget {
            if elapsed > budget {
                return Err(EngineError::HardwareTimeout {
                    tier: self.label,
                    cycles: elapsed,
                    budget,
                });
            }
        }
        Ok(())
    }

    /// Section label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Cycles of the most recent run.
    pub fn last(&self) -> u32 {
        self.last
    }

    /// Shortest run observed, or 0 before any run.
    pub fn min(&self) -> u32 {
        if self.runs == 0 { 0 } else { self.min }
    }

    /// Longest run observed.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Number of completed runs.
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Mean cycles per run, or 0 before any run.
    pub fn average(&self) -> u32 {
        if self.runs == 0 { 0 } else { (self.total / u64::from(self.runs)) as u32 }
    }

    /// Clears all statistics; the budget stays armed.
    pub fn reset(&mut self) {
        self.last = 0;
        self.min = u32::MAX;
        self.max = 0;
        self.total = 0;
        self.runs = 0;
    }
}
