use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ViolationError {
    #[error("violation threshold must be > 0")]
    InvalidThreshold,
}

//
// ─── VIOLATION KIND ────────────────────────────────────────────────────────────
//

/// The two proctoring-rule breaches the runtime detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Tab or window focus was lost.
    FocusLoss,
    /// Fullscreen mode was exited involuntarily.
    FullscreenExit,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::FocusLoss => write!(f, "tab switch detected"),
            ViolationKind::FullscreenExit => write!(f, "fullscreen exit detected"),
        }
    }
}

//
// ─── VIOLATION COUNTER ─────────────────────────────────────────────────────────
//

/// Default number of violations that forces a disqualified submission.
pub const DEFAULT_VIOLATION_THRESHOLD: u32 = 3;

/// Classification of a freshly recorded violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Below the final-warning boundary.
    Warning { count: u32, threshold: u32 },
    /// One more violation will disqualify.
    FinalWarning { count: u32, threshold: u32 },
    /// The threshold was reached; the session must be submitted disqualified.
    ThresholdReached { count: u32 },
}

/// Monotonically non-decreasing violation tally for one session.
///
/// Every distinct proctoring signal increments the count by exactly one, even
/// when two signals land in the same instant; each is an independent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationCounter {
    count: u32,
    threshold: u32,
}

impl Default for ViolationCounter {
    fn default() -> Self {
        Self {
            count: 0,
            threshold: DEFAULT_VIOLATION_THRESHOLD,
        }
    }
}

impl ViolationCounter {
    /// Creates a counter with a custom threshold.
    ///
    /// # Errors
    ///
    /// Returns `ViolationError::InvalidThreshold` if `threshold` is zero.
    pub fn new(threshold: u32) -> Result<Self, ViolationError> {
        if threshold == 0 {
            return Err(ViolationError::InvalidThreshold);
        }
        Ok(Self {
            count: 0,
            threshold,
        })
    }

    /// Record one violation and classify the new total.
    pub fn record(&mut self) -> ViolationOutcome {
        self.count += 1;
        if self.count >= self.threshold {
            ViolationOutcome::ThresholdReached { count: self.count }
        } else if self.count == self.threshold - 1 {
            ViolationOutcome::FinalWarning {
                count: self.count,
                threshold: self.threshold,
            }
        } else {
            ViolationOutcome::Warning {
                count: self.count,
                threshold: self.threshold,
            }
        }
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// True once the count has reached the threshold.
    #[must_use]
    pub fn is_disqualifying(&self) -> bool {
        self.count >= self.threshold
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalates_through_warning_final_warning_threshold() {
        let mut counter = ViolationCounter::default();

        assert_eq!(
            counter.record(),
            ViolationOutcome::Warning {
                count: 1,
                threshold: 3
            }
        );
        assert_eq!(
            counter.record(),
            ViolationOutcome::FinalWarning {
                count: 2,
                threshold: 3
            }
        );
        assert_eq!(counter.record(), ViolationOutcome::ThresholdReached { count: 3 });
        assert!(counter.is_disqualifying());
    }

    #[test]
    fn count_never_decreases() {
        let mut counter = ViolationCounter::default();
        counter.record();
        counter.record();
        let before = counter.count();
        counter.record();
        assert!(counter.count() > before);
    }

    #[test]
    fn threshold_of_one_disqualifies_immediately() {
        let mut counter = ViolationCounter::new(1).unwrap();
        assert_eq!(counter.record(), ViolationOutcome::ThresholdReached { count: 1 });
    }

    #[test]
    fn zero_threshold_is_rejected() {
        assert_eq!(
            ViolationCounter::new(0).unwrap_err(),
            ViolationError::InvalidThreshold
        );
    }

    #[test]
    fn kind_messages_name_the_breach() {
        assert_eq!(ViolationKind::FocusLoss.to_string(), "tab switch detected");
        assert_eq!(
            ViolationKind::FullscreenExit.to_string(),
            "fullscreen exit detected"
        );
    }
}
