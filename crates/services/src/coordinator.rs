use std::sync::Arc;
use tracing::{debug, error, info};

use api::{ExamGateway, GradeReceipt};
use exam_core::Clock;
use exam_core::model::{ExamSession, ResultId, SessionError, SubmissionPayload, TestId};

use crate::error::SubmitError;
use crate::gate::FullscreenGate;
use crate::notify::{Notice, Notifier};

/// What caused a submission to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTrigger {
    /// The countdown reached zero.
    TimerExpired,
    /// The violation threshold was reached.
    ViolationThreshold,
    /// The user pressed submit (first time or retry).
    UserSubmit,
}

/// A snapshotted grading request, ready to dispatch.
///
/// Detached from the session so the run loop can await the network call while
/// the session keeps absorbing (and ignoring) ticks and signals.
pub struct PendingSubmission {
    gateway: Arc<dyn ExamGateway>,
    test_id: TestId,
    payload: SubmissionPayload,
}

impl PendingSubmission {
    #[must_use]
    pub fn payload(&self) -> &SubmissionPayload {
        &self.payload
    }

    /// Send the snapshot to the grading backend.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` on network or backend failure; the session stays
    /// retryable.
    pub async fn dispatch(self) -> Result<GradeReceipt, SubmitError> {
        let receipt = self.gateway.submit(self.test_id, &self.payload).await?;
        Ok(receipt)
    }
}

/// Terminal state machine for the session: collapses competing submission
/// triggers into one in-flight grading request and resolves it.
pub struct SubmissionCoordinator {
    gateway: Arc<dyn ExamGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
}

impl SubmissionCoordinator {
    #[must_use]
    pub fn new(gateway: Arc<dyn ExamGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            clock: Clock::System,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Try to start a submission.
    ///
    /// The entry guard makes this idempotent under racing triggers: only a
    /// session that is `Active` (or `Failed`, for a retry) transitions to
    /// `Submitting`; every other caller gets `None` and backs off. On entry
    /// the ledger and counter are snapshotted and fullscreen is released
    /// best-effort, without counting as a violation.
    pub fn begin(
        &self,
        session: &mut ExamSession,
        gate: &mut FullscreenGate,
        trigger: SubmissionTrigger,
    ) -> Option<PendingSubmission> {
        if !session.can_submit() {
            debug!(?trigger, status = %session.status(), "submission trigger collapsed");
            return None;
        }

        let payload = match session.begin_submission() {
            Ok(payload) => payload,
            // can_submit was checked just above; nothing can interleave.
            Err(_) => return None,
        };
        gate.release_for_submit();

        info!(
            ?trigger,
            answers = payload.answers.len(),
            violations = payload.violation_count,
            disqualified = payload.disqualified,
            "submission started"
        );
        Some(PendingSubmission {
            gateway: Arc::clone(&self.gateway),
            test_id: session.test_id(),
            payload,
        })
    }

    /// Apply a successful dispatch: the session completes with its result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if no submission was in flight.
    pub fn complete(
        &self,
        session: &mut ExamSession,
        receipt: GradeReceipt,
    ) -> Result<ResultId, SessionError> {
        session.complete(receipt.result_id.clone(), self.clock.now())?;
        info!(result = %receipt.result_id, "session completed");
        Ok(receipt.result_id)
    }

    /// Apply a failed dispatch: the session becomes retryable, with ledger
    /// and violation count untouched.
    pub fn fail(&self, session: &mut ExamSession, err: &SubmitError) {
        error!(error = %err, "grading dispatch failed; session retryable");
        if session.fail_submission().is_ok() {
            self.notifier.notify(Notice::submission_failed());
        }
    }

    /// Begin, dispatch and resolve in one call, for hosts that drive the
    /// session directly rather than through the run loop.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` when the dispatch fails; `Ok(None)` means the
    /// trigger was collapsed into an existing submission.
    pub async fn submit(
        &self,
        session: &mut ExamSession,
        gate: &mut FullscreenGate,
        trigger: SubmissionTrigger,
    ) -> Result<Option<ResultId>, SubmitError> {
        let Some(pending) = self.begin(session, gate, trigger) else {
            return Ok(None);
        };

        match pending.dispatch().await {
            Ok(receipt) => {
                let result_id = self.complete(session, receipt)?;
                Ok(Some(result_id))
            }
            Err(err) => {
                self.fail(session, &err);
                Err(err)
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
