//! Batch outcome accounting.

use std::time::{Duration, Instant};

use crate::error::Error;

/// Final outcome of processing one link.
#[derive(Debug)]
pub enum LinkOutcome {
    /// The download completed.
    Downloaded {
        /// Whether the relaxed fallback selector was used.
        used_fallback: bool,
    },
    /// The user declined the confirmation prompt.
    Declined,
    /// A per-link error ended processing.
    Failed(Error),
}

impl LinkOutcome {
    /// Whether this outcome counts as a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}

/// Success/failure counts across a list of links. Counts only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Links processed.
    pub attempted: usize,
    /// Links downloaded successfully.
    pub succeeded: usize,
    /// Successful links that needed the relaxed selector.
    pub fell_back: usize,
    /// Links the user declined.
    pub declined: usize,
    /// Links that failed with an error.
    pub failed: usize,
}

impl BatchResult {
    /// Creates an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            fell_back: 0,
            declined: 0,
            failed: 0,
        }
    }

    /// Records one link's outcome.
    pub const fn record(&mut self, outcome: &LinkOutcome) {
        self.attempted += 1;
        match outcome {
            LinkOutcome::Downloaded { used_fallback } => {
                self.succeeded += 1;
                if *used_fallback {
                    self.fell_back += 1;
                }
            }
            LinkOutcome::Declined => self.declined += 1,
            LinkOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Renders the closing summary line.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "Completed: {}/{} links downloaded successfully.",
            self.succeeded, self.attempted
        )
    }
}

/// Wall-clock timer for a batch run.
#[derive(Debug, Clone, Copy)]
pub struct BatchTimer {
    start: Instant,
}

impl Default for BatchTimer {
    fn default() -> Self {
        Self::start()
    }
}

impl BatchTimer {
    /// Starts timing now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since the batch started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_result_default() {
        let result = BatchResult::default();
        assert_eq!(result, BatchResult::new());
        assert_eq!(result.attempted, 0);
    }

    #[test]
    fn records_every_outcome_kind() {
        let mut result = BatchResult::new();
        result.record(&LinkOutcome::Downloaded {
            used_fallback: false,
        });
        result.record(&LinkOutcome::Declined);
        result.record(&LinkOutcome::Failed(Error::Backend("boom".into())));
        result.record(&LinkOutcome::Downloaded {
            used_fallback: true,
        });

        assert_eq!(result.attempted, 4);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.fell_back, 1);
        assert_eq!(result.declined, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(
            result.summary_line(),
            "Completed: 2/4 links downloaded successfully."
        );
    }

    #[test]
    fn declined_is_not_success() {
        assert!(!LinkOutcome::Declined.is_success());
        assert!(LinkOutcome::Downloaded { used_fallback: false }.is_success());
    }

    #[test]
    fn timer_advances() {
        let timer = BatchTimer::start();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed() >= Duration::from_millis(2));
    }
}
