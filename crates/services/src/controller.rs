use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use api::{ExamGateway, GradeReceipt};
use exam_core::Clock;
use exam_core::model::{
    DEFAULT_VIOLATION_THRESHOLD, ExamProgress, ExamSession, QuestionId, ResultId, SessionStatus,
    TickOutcome, TestId, ViolationKind,
};

use crate::coordinator::{PendingSubmission, SubmissionCoordinator, SubmissionTrigger};
use crate::error::ControllerError;
use crate::events::ProctorEvent;
use crate::gate::{FullscreenControl, FullscreenGate, GateSignal, GateState};
use crate::loader::{LoadOutcome, SessionLoader};
use crate::monitor::{Escalation, ViolationMonitor};
use crate::notify::{Notice, Notifier};

/// How loading resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// A session is ready; proceed to the fullscreen prompt.
    Ready,
    /// The user already finished this test; route to the existing result.
    AlreadyCompleted(ResultId),
}

/// The session context for one exam attempt.
///
/// Owns every piece of per-attempt state — session, gate, monitor,
/// coordinator — so two attempts (different tests, different tabs) can never
/// share or cross-contaminate state through globals. Constructed when the
/// exam view is entered and dropped when it is left.
///
/// All mutating methods are meant to be called from one logical event queue;
/// the `runtime::drive` loop does exactly that.
pub struct ExamController {
    test_id: TestId,
    gateway: Arc<dyn ExamGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
    threshold: u32,
    loader: SessionLoader,
    gate: FullscreenGate,
    monitor: ViolationMonitor,
    coordinator: SubmissionCoordinator,
    session: Option<ExamSession>,
}

impl ExamController {
    #[must_use]
    pub fn new(
        test_id: TestId,
        gateway: Arc<dyn ExamGateway>,
        fullscreen: Arc<dyn FullscreenControl>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let loader = SessionLoader::new(Arc::clone(&gateway));
        let gate = FullscreenGate::new(fullscreen);
        let monitor = ViolationMonitor::new(Arc::clone(&notifier));
        let coordinator = SubmissionCoordinator::new(Arc::clone(&gateway), Arc::clone(&notifier));
        Self {
            test_id,
            gateway,
            notifier,
            clock: Clock::System,
            threshold: DEFAULT_VIOLATION_THRESHOLD,
            loader,
            gate,
            monitor,
            coordinator,
            session: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.coordinator = SubmissionCoordinator::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.notifier),
        )
        .with_clock(clock);
        self
    }

    /// Override the violation threshold (default 3).
    #[must_use]
    pub fn with_violation_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    /// Fetch the paper and construct the session.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Load` when the fetch fails; the host aborts
    /// to the dashboard with the error's user message.
    pub async fn load(&mut self) -> Result<LoadReport, ControllerError> {
        match self.loader.load(self.test_id).await? {
            LoadOutcome::AlreadyCompleted(result_id) => {
                self.notifier.notify(Notice::already_completed());
                Ok(LoadReport::AlreadyCompleted(result_id))
            }
            LoadOutcome::Ready(paper) => {
                self.session = Some(ExamSession::with_threshold(paper, self.threshold)?);
                Ok(LoadReport::Ready)
            }
        }
    }

    /// The user consented to start: engage the gate and start the countdown.
    ///
    /// Returns whether fullscreen actually engaged; on denial the attempt
    /// still starts, unprotected, and the user is notified.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NotLoaded` before a successful `load`, or a
    /// session error if the attempt was already started.
    pub fn begin(&mut self) -> Result<bool, ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NotLoaded)?;
        let engaged = self.gate.engage();
        if !engaged {
            self.notifier.notify(Notice::proctoring_unavailable());
        }
        session.begin(self.clock.now())?;
        info!(test = %self.test_id, fullscreen = engaged, "attempt started");
        Ok(engaged)
    }

    // ── answers & navigation ───────────────────────────────────────────────

    /// Record (or overwrite) the response to a question.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError` when no session is loaded or the ledger is
    /// frozen.
    pub fn record_answer(
        &mut self,
        question: QuestionId,
        value: impl Into<String>,
    ) -> Result<(), ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NotLoaded)?;
        session.record_answer(question, value)?;
        Ok(())
    }

    /// Record a multi-blank response.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError` when no session is loaded, the ledger is
    /// frozen, or the map cannot be encoded.
    pub fn record_blank_answers(
        &mut self,
        question: QuestionId,
        blanks: &BTreeMap<String, String>,
    ) -> Result<(), ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NotLoaded)?;
        session.record_blank_answers(question, blanks)?;
        Ok(())
    }

    pub fn next_question(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.next_question();
        }
    }

    pub fn prev_question(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.prev_question();
        }
    }

    // ── event handling ─────────────────────────────────────────────────────

    /// React to a platform event; may start a disqualified submission.
    pub fn handle_event(&mut self, event: ProctorEvent) -> Option<PendingSubmission> {
        let session = self.session.as_mut()?;

        let kind = match event {
            ProctorEvent::TabHidden => Some(ViolationKind::FocusLoss),
            ProctorEvent::TabVisible => None,
            ProctorEvent::FullscreenEntered => {
                self.gate.observe_change(true);
                None
            }
            ProctorEvent::FullscreenExited => {
                self.gate.observe_change(false).map(|signal| match signal {
                    GateSignal::InvoluntaryExit => ViolationKind::FullscreenExit,
                })
            }
        }?;

        match self.monitor.observe(session, kind) {
            Escalation::Disqualify => self.coordinator.begin(
                session,
                &mut self.gate,
                SubmissionTrigger::ViolationThreshold,
            ),
            Escalation::Warned | Escalation::Ignored => None,
        }
    }

    /// Apply one countdown tick; may start the expiry submission.
    pub fn handle_tick(&mut self) -> Option<PendingSubmission> {
        let session = self.session.as_mut()?;
        match session.tick() {
            TickOutcome::Expired => {
                info!(test = %self.test_id, "time expired");
                self.coordinator
                    .begin(session, &mut self.gate, SubmissionTrigger::TimerExpired)
            }
            TickOutcome::Counting { .. } | TickOutcome::Ignored => None,
        }
    }

    /// The user asked to submit (or retry after a failure).
    pub fn request_submit(&mut self) -> Option<PendingSubmission> {
        let session = self.session.as_mut()?;
        self.coordinator
            .begin(session, &mut self.gate, SubmissionTrigger::UserSubmit)
    }

    /// Ask the platform to re-enter fullscreen after a manual exit.
    pub fn re_enter_fullscreen(&mut self) -> bool {
        self.gate.request_re_entry()
    }

    /// Resolve a finished dispatch; returns the result id on success.
    pub fn resolve_submission(
        &mut self,
        outcome: Result<GradeReceipt, crate::error::SubmitError>,
    ) -> Option<ResultId> {
        let session = self.session.as_mut()?;
        match outcome {
            Ok(receipt) => self.coordinator.complete(session, receipt).ok(),
            Err(err) => {
                self.coordinator.fail(session, &err);
                None
            }
        }
    }

    /// Begin, dispatch and resolve inline, for hosts not using the run loop.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Submit` when the dispatch fails (the session
    /// stays retryable); `Ok(None)` means the trigger collapsed into an
    /// already-running submission.
    pub async fn submit(&mut self) -> Result<Option<ResultId>, ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NotLoaded)?;
        let result = self
            .coordinator
            .submit(session, &mut self.gate, SubmissionTrigger::UserSubmit)
            .await?;
        Ok(result)
    }

    // ── accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    /// Session status, or `Loading` while the paper fetch is outstanding.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(SessionStatus::Loading, ExamSession::status)
    }

    #[must_use]
    pub fn session(&self) -> Option<&ExamSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    #[must_use]
    pub fn progress(&self) -> Option<ExamProgress> {
        self.session.as_ref().map(ExamSession::progress)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::UnsupportedFullscreen;
    use crate::notify::{ChannelNotifier, Notice, Severity};
    use api::InMemoryGateway;
    use exam_core::model::{ExamPaper, Question, SessionId};
    use exam_core::time::fixed_clock;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn build_paper(test: u64, session_id: Option<SessionId>) -> ExamPaper {
        let questions = vec![
            Question::new(QuestionId::new(1), "reading", json!({"passage": "p"}), 5),
            Question::new(QuestionId::new(2), "mcq", json!({"question": "q"}), 5),
        ];
        ExamPaper::new(TestId::new(test), "Aptitude", 10, questions, session_id).unwrap()
    }

    fn build_controller(
        gateway: &InMemoryGateway,
    ) -> (ExamController, UnboundedReceiver<Notice>) {
        let (notifier, notices) = ChannelNotifier::channel();
        let controller = ExamController::new(
            TestId::new(1),
            Arc::new(gateway.clone()),
            Arc::new(UnsupportedFullscreen),
            notifier,
        )
        .with_clock(fixed_clock());
        (controller, notices)
    }

    async fn started_controller(
        gateway: &InMemoryGateway,
    ) -> (ExamController, UnboundedReceiver<Notice>) {
        gateway.put_paper(build_paper(1, Some(SessionId::new("abc123"))));
        let (mut controller, notices) = build_controller(gateway);
        controller.load().await.unwrap();
        controller.begin().unwrap();
        (controller, notices)
    }

    #[tokio::test]
    async fn load_reports_already_completed_without_session() {
        let gateway = InMemoryGateway::new();
        gateway.mark_completed(TestId::new(1), ResultId::new("r1"));
        let (mut controller, mut notices) = build_controller(&gateway);

        let report = controller.load().await.unwrap();
        assert_eq!(report, LoadReport::AlreadyCompleted(ResultId::new("r1")));
        assert!(controller.session().is_none());
        assert_eq!(controller.status(), SessionStatus::Loading);
        assert_eq!(notices.try_recv().unwrap().severity, Severity::Info);
    }

    #[tokio::test]
    async fn begin_degrades_gracefully_without_fullscreen() {
        let gateway = InMemoryGateway::new();
        gateway.put_paper(build_paper(1, None));
        let (mut controller, mut notices) = build_controller(&gateway);
        controller.load().await.unwrap();

        let engaged = controller.begin().unwrap();

        assert!(!engaged);
        assert_eq!(controller.status(), SessionStatus::Active);
        assert_eq!(controller.gate_state(), GateState::Active);
        let notice = notices.try_recv().unwrap();
        assert!(notice.message.contains("unprotected"));
    }

    #[tokio::test]
    async fn third_violation_starts_disqualified_submission() {
        let gateway = InMemoryGateway::new();
        let (mut controller, _notices) = started_controller(&gateway).await;

        assert!(controller.handle_event(ProctorEvent::TabHidden).is_none());
        assert!(controller.handle_event(ProctorEvent::FullscreenExited).is_none());
        let pending = controller.handle_event(ProctorEvent::TabHidden);

        let pending = pending.expect("third violation should trigger submission");
        assert!(pending.payload().disqualified);
        assert_eq!(pending.payload().violation_count, 3);
        assert_eq!(controller.status(), SessionStatus::Submitting);

        // A fourth signal has no observable effect on the finalizing session.
        assert!(controller.handle_event(ProctorEvent::TabHidden).is_none());
        assert_eq!(
            controller.session().unwrap().violations().count(),
            3
        );
    }

    #[tokio::test]
    async fn tab_visible_is_never_a_violation() {
        let gateway = InMemoryGateway::new();
        let (mut controller, _notices) = started_controller(&gateway).await;

        assert!(controller.handle_event(ProctorEvent::TabVisible).is_none());
        assert_eq!(controller.session().unwrap().violations().count(), 0);
    }

    #[tokio::test]
    async fn expiry_tick_starts_clean_submission() {
        let gateway = InMemoryGateway::new();
        let (mut controller, _notices) = started_controller(&gateway).await;

        for _ in 0..599 {
            assert!(controller.handle_tick().is_none());
        }
        let pending = controller.handle_tick().expect("expiry should submit");
        assert!(!pending.payload().disqualified);

        // Racing ticks after expiry are no-ops.
        assert!(controller.handle_tick().is_none());
    }

    #[tokio::test]
    async fn resolve_failure_then_retry_succeeds() {
        let gateway = InMemoryGateway::new();
        gateway.fail_next_submissions(1);
        let (mut controller, mut notices) = started_controller(&gateway).await;
        controller.record_answer(QuestionId::new(1), "kept").unwrap();

        let pending = controller.request_submit().unwrap();
        let outcome = pending.dispatch().await;
        assert!(controller.resolve_submission(outcome).is_none());
        assert_eq!(controller.status(), SessionStatus::Failed);
        let failure = notices.try_recv().unwrap();
        assert_eq!(failure.severity, Severity::Critical);

        let pending = controller.request_submit().unwrap();
        assert_eq!(
            pending.payload().answers.get(&QuestionId::new(1)).map(String::as_str),
            Some("kept")
        );
        let outcome = pending.dispatch().await;
        let result = controller.resolve_submission(outcome).unwrap();
        assert_eq!(result.as_str(), "result-1");
        assert_eq!(controller.status(), SessionStatus::Completed);
    }

    #[tokio::test]
    async fn inline_submit_propagates_session_id() {
        let gateway = InMemoryGateway::new();
        let (mut controller, _notices) = started_controller(&gateway).await;
        controller.record_answer(QuestionId::new(1), "done").unwrap();

        let result = controller.submit().await.unwrap();
        assert!(result.is_some());

        let (_, payload) = gateway.last_submission().unwrap();
        assert_eq!(
            payload.session_id.as_ref().map(SessionId::as_str),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn navigation_steps_through_questions() {
        let gateway = InMemoryGateway::new();
        let (mut controller, _notices) = started_controller(&gateway).await;

        controller.next_question();
        let progress = controller.progress().unwrap();
        assert_eq!(progress.current, 1);
        assert!(controller.session().unwrap().is_last_question());

        controller.prev_question();
        assert_eq!(controller.progress().unwrap().current, 0);
    }
}
