use std::sync::Arc;
use tracing::{info, warn};

use exam_core::model::{ExamSession, SessionStatus, ViolationKind, ViolationOutcome};

use crate::notify::{Notice, Notifier};

/// What the caller must do after a violation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// A warning (possibly the final one) was issued; the session stays
    /// active.
    Warned,
    /// The threshold was reached; trigger a disqualified submission.
    Disqualify,
    /// The session is already finalizing; the signal was dropped.
    Ignored,
}

/// Watches proctoring signals and escalates toward disqualification.
///
/// Each distinct signal counts once, even when two different signals land in
/// the same instant. Notifications are the monitor's only side effect beside
/// the counter itself; it never touches the ledger or the timer.
pub struct ViolationMonitor {
    notifier: Arc<dyn Notifier>,
}

impl ViolationMonitor {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Record one violation signal against the session.
    pub fn observe(&self, session: &mut ExamSession, kind: ViolationKind) -> Escalation {
        if session.status() != SessionStatus::Active {
            info!(?kind, status = %session.status(), "violation signal ignored");
            return Escalation::Ignored;
        }

        let outcome = match session.register_violation() {
            Ok(outcome) => outcome,
            // Status was checked above; losing this race is harmless.
            Err(_) => return Escalation::Ignored,
        };

        match outcome {
            ViolationOutcome::Warning { count, threshold } => {
                warn!(?kind, count, threshold, "proctoring violation");
                self.notifier
                    .notify(Notice::violation_warning(kind, count, threshold));
                Escalation::Warned
            }
            ViolationOutcome::FinalWarning { count, threshold } => {
                warn!(?kind, count, threshold, "final proctoring warning");
                self.notifier.notify(Notice::final_warning(count, threshold));
                Escalation::Warned
            }
            ViolationOutcome::ThresholdReached { count } => {
                warn!(?kind, count, "violation threshold reached, disqualifying");
                self.notifier.notify(Notice::disqualified(count));
                Escalation::Disqualify
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelNotifier, Severity};
    use exam_core::model::{ExamPaper, Question, QuestionId, TestId};
    use exam_core::time::fixed_now;
    use serde_json::json;

    fn active_session() -> ExamSession {
        let question = Question::new(QuestionId::new(1), "reading", json!({"passage": "p"}), 5);
        let paper = ExamPaper::new(TestId::new(1), "Aptitude", 10, vec![question], None).unwrap();
        let mut session = ExamSession::new(paper);
        session.begin(fixed_now()).unwrap();
        session
    }

    #[test]
    fn escalates_to_disqualification_at_threshold() {
        let (notifier, mut notices) = ChannelNotifier::channel();
        let monitor = ViolationMonitor::new(notifier);
        let mut session = active_session();

        assert_eq!(
            monitor.observe(&mut session, ViolationKind::FocusLoss),
            Escalation::Warned
        );
        assert_eq!(
            monitor.observe(&mut session, ViolationKind::FullscreenExit),
            Escalation::Warned
        );
        assert_eq!(
            monitor.observe(&mut session, ViolationKind::FocusLoss),
            Escalation::Disqualify
        );

        let first = notices.try_recv().unwrap();
        assert_eq!(first.severity, Severity::Warning);
        assert!(first.message.contains("1/3"));

        let second = notices.try_recv().unwrap();
        assert_eq!(second.severity, Severity::Critical);
        assert!(second.message.contains("FINAL WARNING"));

        let third = notices.try_recv().unwrap();
        assert!(third.message.contains("Disqualified"));
        assert_eq!(session.violations().count(), 3);
    }

    #[test]
    fn signals_after_finalization_are_dropped() {
        let (notifier, mut notices) = ChannelNotifier::channel();
        let monitor = ViolationMonitor::new(notifier);
        let mut session = active_session();
        session.begin_submission().unwrap();

        assert_eq!(
            monitor.observe(&mut session, ViolationKind::FocusLoss),
            Escalation::Ignored
        );
        assert_eq!(session.violations().count(), 0);
        assert!(notices.try_recv().is_err());
    }

    #[test]
    fn simultaneous_distinct_signals_count_twice() {
        let (notifier, _notices) = ChannelNotifier::channel();
        let monitor = ViolationMonitor::new(notifier);
        let mut session = active_session();

        monitor.observe(&mut session, ViolationKind::FocusLoss);
        monitor.observe(&mut session, ViolationKind::FullscreenExit);
        assert_eq!(session.violations().count(), 2);
    }
}
