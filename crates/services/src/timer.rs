use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Interval between countdown decrements.
pub const TICK: Duration = Duration::from_secs(1);

/// Wall-clock cadence for the session countdown.
///
/// One `CountdownTimer` is started the moment the session becomes active and
/// is owned by the run loop, so dropping the loop releases the interval on
/// every exit path. The decrement arithmetic lives in the session's
/// `TimerState`; this type only paces it.
///
/// The countdown is client-clock-authoritative: nothing re-checks the
/// remaining time against the server, so tampering with the local clock or
/// the process can stretch an attempt. A known fairness gap, deliberately not
/// papered over here.
pub struct CountdownTimer {
    interval: Interval,
}

impl CountdownTimer {
    /// Start ticking, with the first tick due one second from now.
    #[must_use]
    pub fn start() -> Self {
        let mut interval = interval_at(Instant::now() + TICK, TICK);
        // Late ticks must not bunch up; a busy host skews rather than bursts.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Wait for the next one-second boundary.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
