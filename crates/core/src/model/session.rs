use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::answers::{AnswerError, AnswerSheet};
use crate::model::ids::{QuestionId, ResultId, SessionId, TestId};
use crate::model::paper::ExamPaper;
use crate::model::question::Question;
use crate::model::timer::TimerState;
use crate::model::violation::{ViolationCounter, ViolationError, ViolationOutcome};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is not active (status: {status})")]
    NotActive { status: SessionStatus },

    #[error("session cannot be submitted from status {status}")]
    NotSubmittable { status: SessionStatus },

    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error(transparent)]
    Violation(#[from] ViolationError),

    #[error(transparent)]
    Answer(#[from] AnswerError),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a session.
///
/// Transitions are monotone: apart from the sanctioned `Failed -> Submitting`
/// retry, a session never moves backwards. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The paper is still being fetched; no session value exists yet.
    Loading,
    /// Paper loaded; waiting for the user to consent to proctored mode.
    AwaitingFullscreen,
    /// The attempt is underway: timer running, answers and violations mutable.
    Active,
    /// A grading request is in flight.
    Submitting,
    /// Grading succeeded; the result reference is available.
    Completed,
    /// The grading request failed; a manual retry may re-enter `Submitting`.
    Failed,
}

impl SessionStatus {
    /// Whether a direct transition to `next` is legal.
    #[must_use]
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Loading, SessionStatus::AwaitingFullscreen)
                | (SessionStatus::AwaitingFullscreen, SessionStatus::Active)
                | (SessionStatus::Active, SessionStatus::Submitting)
                | (SessionStatus::Submitting, SessionStatus::Completed)
                | (SessionStatus::Submitting, SessionStatus::Failed)
                | (SessionStatus::Failed, SessionStatus::Submitting)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Loading => "loading",
            SessionStatus::AwaitingFullscreen => "awaiting-fullscreen",
            SessionStatus::Active => "active",
            SessionStatus::Submitting => "submitting",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

//
// ─── TICK OUTCOME ──────────────────────────────────────────────────────────────
//

/// Result of applying one countdown tick to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down.
    Counting { remaining_secs: u32 },
    /// Time is up; the caller must trigger submission.
    Expired,
    /// The session is not active; the tick had no effect.
    Ignored,
}

//
// ─── SUBMISSION PAYLOAD ────────────────────────────────────────────────────────
//

/// Immutable snapshot handed to the grading backend.
///
/// `disqualified` is derived from the violation counter at snapshot time, so
/// it is true exactly when the count has reached the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub answers: BTreeMap<QuestionId, String>,
    pub violation_count: u32,
    pub disqualified: bool,
    pub session_id: Option<SessionId>,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Aggregated attempt progress for the host's header/progress UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    pub total: usize,
    pub answered: usize,
    pub current: usize,
}

//
// ─── EXAM SESSION ──────────────────────────────────────────────────────────────
//

/// One timed attempt at a test, from paper load to submission.
///
/// Owns the answer sheet, the violation counter and the remaining-time state;
/// the runtime components mutate it only through the guarded operations below,
/// all serialized on one logical event queue. The session is deliberately not
/// persisted: navigating away or reloading discards it, including answers and
/// violations.
pub struct ExamSession {
    test_id: TestId,
    title: String,
    session_id: Option<SessionId>,
    questions: Vec<Question>,
    duration_secs: u32,
    current: usize,
    answers: AnswerSheet,
    violations: ViolationCounter,
    timer: TimerState,
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result_id: Option<ResultId>,
}

impl ExamSession {
    /// Create a session from a loaded paper with the default violation
    /// threshold.
    #[must_use]
    pub fn new(paper: ExamPaper) -> Self {
        Self::build(paper, ViolationCounter::default())
    }

    /// Create a session with a custom violation threshold.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Violation` if `threshold` is zero.
    pub fn with_threshold(paper: ExamPaper, threshold: u32) -> Result<Self, SessionError> {
        Ok(Self::build(paper, ViolationCounter::new(threshold)?))
    }

    fn build(paper: ExamPaper, violations: ViolationCounter) -> Self {
        let (test_id, title, duration_mins, questions, session_id) = paper.into_parts();
        let duration_secs = duration_mins * 60;
        Self {
            test_id,
            title,
            session_id,
            questions,
            duration_secs,
            current: 0,
            answers: AnswerSheet::new(),
            violations,
            timer: TimerState::new(duration_secs),
            status: SessionStatus::AwaitingFullscreen,
            started_at: None,
            completed_at: None,
            result_id: None,
        }
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    /// Start the attempt: the fullscreen gate has been passed.
    ///
    /// Arms the countdown at the full duration; time spent on the fullscreen
    /// prompt does not count against the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is
    /// awaiting fullscreen.
    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.advance(SessionStatus::Active)?;
        self.timer = TimerState::new(self.duration_secs);
        self.started_at = Some(now);
        Ok(())
    }

    /// Apply one countdown tick.
    ///
    /// Ticks are ignored unless the session is active, so a tick racing a
    /// just-started submission is a no-op.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Active {
            return TickOutcome::Ignored;
        }
        let remaining = self.timer.tick();
        if remaining == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Counting {
                remaining_secs: remaining,
            }
        }
    }

    /// Record one proctoring violation and classify the new total.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` once the session has left `Active`;
    /// signals arriving while a submission is finalizing are ignored upstream.
    pub fn register_violation(&mut self) -> Result<ViolationOutcome, SessionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionError::NotActive {
                status: self.status,
            });
        }
        Ok(self.violations.record())
    }

    // ── answers ────────────────────────────────────────────────────────────

    /// Record (or overwrite) the response to a question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` once the ledger is frozen (status has
    /// left `Active`).
    pub fn record_answer(
        &mut self,
        question: QuestionId,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.answers.record(question, value);
        Ok(())
    }

    /// Record a multi-blank response as a serialized blank→choice map.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` when the ledger is frozen, or
    /// `SessionError::Answer` if the map cannot be encoded.
    pub fn record_blank_answers(
        &mut self,
        question: QuestionId,
        blanks: &BTreeMap<String, String>,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.answers.record_blanks(question, blanks)?;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Active {
            return Err(SessionError::NotActive {
                status: self.status,
            });
        }
        Ok(())
    }

    // ── submission ─────────────────────────────────────────────────────────

    /// Whether a submission may be started right now.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Active | SessionStatus::Failed
        )
    }

    /// Enter `Submitting` and snapshot the payload for dispatch.
    ///
    /// Freezes the ledger and violation counter; `disqualified` is derived
    /// from the counter so the flag and the count can never disagree. A retry
    /// from `Failed` re-snapshots under the same rules (the frozen state is
    /// unchanged, so the payload is identical).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmittable` from any other status;
    /// `Submitting` in particular means another trigger already won the race.
    pub fn begin_submission(&mut self) -> Result<SubmissionPayload, SessionError> {
        if !self.can_submit() {
            return Err(SessionError::NotSubmittable {
                status: self.status,
            });
        }
        self.status = SessionStatus::Submitting;
        Ok(SubmissionPayload {
            answers: self.answers.snapshot(),
            violation_count: self.violations.count(),
            disqualified: self.violations.is_disqualifying(),
            session_id: self.session_id.clone(),
        })
    }

    /// Grading succeeded; the session is complete.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless a submission is in
    /// flight.
    pub fn complete(
        &mut self,
        result_id: ResultId,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.advance(SessionStatus::Completed)?;
        self.completed_at = Some(now);
        self.result_id = Some(result_id);
        Ok(())
    }

    /// Grading dispatch failed; the session becomes retryable.
    ///
    /// Answers and violations are left untouched for the retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless a submission is in
    /// flight.
    pub fn fail_submission(&mut self) -> Result<(), SessionError> {
        self.advance(SessionStatus::Failed)
    }

    fn advance(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_advance_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    // ── navigation ─────────────────────────────────────────────────────────

    /// Step to the next question, clamped at the last one.
    pub fn next_question(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
    }

    /// Step to the previous question, clamped at the first one.
    pub fn prev_question(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        // `current` is clamped to the question list, which is never empty.
        &self.questions[self.current]
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            total: self.questions.len(),
            answered: self.answers.answered_count(),
            current: self.current,
        }
    }

    // ── accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn violations(&self) -> &ViolationCounter {
        &self.violations
    }

    #[must_use]
    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.timer.remaining_secs()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn result_id(&self) -> Option<&ResultId> {
        self.result_id.as_ref()
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("test_id", &self.test_id)
            .field("status", &self.status)
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.answered_count())
            .field("violations", &self.violations.count())
            .field("remaining_secs", &self.timer.remaining_secs())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
