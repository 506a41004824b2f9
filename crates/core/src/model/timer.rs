/// Remaining time below which the host should render the countdown as urgent.
pub const LOW_TIME_SECS: u32 = 300;

/// Remaining-time state for the active session.
///
/// Monotonically non-increasing: the only mutation is a one-second decrement,
/// saturating at zero. The cadence is driven externally by the runtime's
/// wall-clock interval; this type just owns the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    remaining_secs: u32,
}

impl TimerState {
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            remaining_secs: duration_secs,
        }
    }

    /// Apply one tick; returns the remaining seconds after the decrement.
    pub fn tick(&mut self) -> u32 {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.remaining_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    /// True once less than five minutes remain.
    #[must_use]
    pub fn is_low_time(&self) -> bool {
        self.remaining_secs < LOW_TIME_SECS
    }

    /// Render the remaining time as "M:SS" for the host's countdown display.
    #[must_use]
    pub fn format_clock(&self) -> String {
        let mins = self.remaining_secs / 60;
        let secs = self.remaining_secs % 60;
        format!("{mins}:{secs:02}")
    }
}
