use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

//
// ─── PLATFORM SEAM ─────────────────────────────────────────────────────────────
//

/// The platform denied or does not support fullscreen.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("fullscreen is unavailable on this platform")]
pub struct FullscreenUnavailable;

/// Platform hook for entering and leaving fullscreen mode.
///
/// Hosts wrap the real platform call; headless embeddings and tests use
/// doubles. Both operations are requests, not guarantees — the observed state
/// arrives later as a fullscreen event.
pub trait FullscreenControl: Send + Sync {
    /// Request fullscreen mode.
    ///
    /// # Errors
    ///
    /// Returns `FullscreenUnavailable` when the platform denies the request.
    fn enter(&self) -> Result<(), FullscreenUnavailable>;

    /// Request leaving fullscreen mode.
    ///
    /// # Errors
    ///
    /// Returns `FullscreenUnavailable` when the platform denies the request.
    fn exit(&self) -> Result<(), FullscreenUnavailable>;
}

/// Control double for platforms without fullscreen support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedFullscreen;

impl FullscreenControl for UnsupportedFullscreen {
    fn enter(&self) -> Result<(), FullscreenUnavailable> {
        Err(FullscreenUnavailable)
    }

    fn exit(&self) -> Result<(), FullscreenUnavailable> {
        Err(FullscreenUnavailable)
    }
}

//
// ─── GATE ──────────────────────────────────────────────────────────────────────
//

/// Gate lifecycle: the consent prompt, proctored mode, and exits from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for the user to consent to proctored mode.
    Prompt,
    /// Fullscreen engaged (or gracefully degraded).
    Active,
    /// Fullscreen was left; re-entry returns to `Active`.
    Exited,
}

/// Signal the gate raises toward the violation monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// Fullscreen was lost involuntarily while the session was proctored.
    InvoluntaryExit,
}

/// Mediates entry into proctored mode and classifies fullscreen transitions.
///
/// Exits caused by the submission flow itself are suppressed: leaving
/// fullscreen right before dispatch must not count as a violation.
pub struct FullscreenGate {
    control: Arc<dyn FullscreenControl>,
    state: GateState,
    finalizing: bool,
}

impl FullscreenGate {
    #[must_use]
    pub fn new(control: Arc<dyn FullscreenControl>) -> Self {
        Self {
            control,
            state: GateState::Prompt,
            finalizing: false,
        }
    }

    /// The user consented to start: request fullscreen and open the gate.
    ///
    /// Returns `false` when the platform denied the request; the gate still
    /// opens (proctoring degrades gracefully rather than blocking the exam)
    /// and the caller surfaces the degradation to the user.
    pub fn engage(&mut self) -> bool {
        let engaged = match self.control.enter() {
            Ok(()) => true,
            Err(FullscreenUnavailable) => {
                warn!("fullscreen denied or unsupported; proceeding unproctored");
                false
            }
        };
        self.state = GateState::Active;
        engaged
    }

    /// Ask the platform to re-enter fullscreen after a manual exit.
    ///
    /// State moves back to `Active` only when the matching fullscreen event
    /// arrives via `observe_change`. Never counts as a violation and never
    /// clears earlier ones.
    pub fn request_re_entry(&self) -> bool {
        self.control.enter().is_ok()
    }

    /// Classify an observed fullscreen transition.
    ///
    /// Returns a `GateSignal` only for involuntary exits that occurred while
    /// the gate was open and no submission was finalizing.
    pub fn observe_change(&mut self, fullscreen: bool) -> Option<GateSignal> {
        if self.state == GateState::Prompt {
            // Transitions before consent are not proctoring-relevant.
            return None;
        }

        if fullscreen {
            self.state = GateState::Active;
            return None;
        }

        self.state = GateState::Exited;
        if self.finalizing {
            debug!("fullscreen exit during finalization, suppressed");
            return None;
        }
        Some(GateSignal::InvoluntaryExit)
    }

    /// Leave fullscreen ahead of dispatch, best-effort.
    ///
    /// Marks the gate as finalizing so the resulting exit event is not
    /// reported as a violation. Platform refusal is ignored.
    pub fn release_for_submit(&mut self) {
        self.finalizing = true;
        if self.control.exit().is_err() {
            debug!("fullscreen exit before submit was denied; ignoring");
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingControl {
        deny_enter: bool,
        enters: AtomicU32,
        exits: AtomicU32,
    }

    impl FullscreenControl for RecordingControl {
        fn enter(&self) -> Result<(), FullscreenUnavailable> {
            self.enters.fetch_add(1, Ordering::SeqCst);
            if self.deny_enter {
                Err(FullscreenUnavailable)
            } else {
                Ok(())
            }
        }

        fn exit(&self) -> Result<(), FullscreenUnavailable> {
            self.exits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn engage_opens_gate_even_when_denied() {
        let control = Arc::new(RecordingControl {
            deny_enter: true,
            ..RecordingControl::default()
        });
        let mut gate = FullscreenGate::new(control);

        assert!(!gate.engage());
        assert_eq!(gate.state(), GateState::Active);
    }

    #[test]
    fn involuntary_exit_raises_signal() {
        let mut gate = FullscreenGate::new(Arc::new(RecordingControl::default()));
        gate.engage();

        assert_eq!(
            gate.observe_change(false),
            Some(GateSignal::InvoluntaryExit)
        );
        assert_eq!(gate.state(), GateState::Exited);
    }

    #[test]
    fn re_entry_is_silent() {
        let mut gate = FullscreenGate::new(Arc::new(RecordingControl::default()));
        gate.engage();
        gate.observe_change(false);

        assert!(gate.request_re_entry());
        assert_eq!(gate.observe_change(true), None);
        assert_eq!(gate.state(), GateState::Active);
    }

    #[test]
    fn exit_during_finalization_is_suppressed() {
        let control = Arc::new(RecordingControl::default());
        let mut gate = FullscreenGate::new(control.clone() as Arc<dyn FullscreenControl>);
        gate.engage();

        gate.release_for_submit();
        assert_eq!(control.exits.load(Ordering::SeqCst), 1);
        assert_eq!(gate.observe_change(false), None);
    }

    #[test]
    fn changes_before_consent_are_ignored() {
        let mut gate = FullscreenGate::new(Arc::new(RecordingControl::default()));
        assert_eq!(gate.observe_change(false), None);
        assert_eq!(gate.state(), GateState::Prompt);
    }
}
