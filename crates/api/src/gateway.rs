use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use exam_core::model::{ExamPaper, ResultId, SubmissionPayload, TestId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors surfaced by the assessment-backend boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("test not found")]
    NotFound,

    #[error("the backend rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("invalid gateway configuration: {0}")]
    Config(String),
}

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// Outcome of fetching a test paper.
///
/// A paper is served at most once per user and test; once a graded result
/// exists the backend short-circuits with its reference instead of a paper.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperFetch {
    /// The user already finished this test; route to the existing result.
    AlreadyCompleted { result_id: ResultId },
    /// A fresh (or refreshed, for an open session) paper to sit.
    Paper(ExamPaper),
}

/// Acknowledgement of a graded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReceipt {
    pub result_id: ResultId,
}

/// Gateway contract to the assessment backend.
///
/// The grading service behind `submit` is opaque to the runtime; it receives
/// the answer snapshot plus the violation tally and returns a result
/// reference.
#[async_trait]
pub trait ExamGateway: Send + Sync {
    /// Fetch the paper for a test.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the test is unavailable or the request fails.
    async fn fetch_paper(&self, test: TestId) -> Result<PaperFetch, ApiError>;

    /// Submit the final payload for grading.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network or backend failure; the caller treats
    /// every submit error as retryable.
    async fn submit(
        &self,
        test: TestId,
        payload: &SubmissionPayload,
    ) -> Result<GradeReceipt, ApiError>;
}

//
// ─── IN-MEMORY GATEWAY ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct GatewayState {
    papers: HashMap<TestId, PaperFetch>,
    submissions: Vec<(TestId, SubmissionPayload)>,
    attempts: u32,
    fail_next_submissions: u32,
}

/// In-memory gateway for tests and prototyping.
///
/// Papers are scripted up front; submissions are recorded so tests can assert
/// on exactly what went out, and the next N submissions can be made to fail
/// to exercise the retry path.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<Mutex<GatewayState>>,
    submit_delay: Option<Duration>,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the paper served for a test.
    pub fn put_paper(&self, paper: ExamPaper) {
        let mut state = self.lock();
        state
            .papers
            .insert(paper.test_id(), PaperFetch::Paper(paper));
    }

    /// Script the already-completed short circuit for a test.
    pub fn mark_completed(&self, test: TestId, result_id: ResultId) {
        let mut state = self.lock();
        state
            .papers
            .insert(test, PaperFetch::AlreadyCompleted { result_id });
    }

    /// Make the next `n` submissions fail with a transport error.
    pub fn fail_next_submissions(&self, n: u32) {
        self.lock().fail_next_submissions = n;
    }

    /// Hold each submission for `delay` before resolving, to widen race
    /// windows in tests.
    #[must_use]
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Number of accepted (successful) submissions.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    /// Number of submission attempts, including failed ones.
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.lock().attempts
    }

    /// The most recently accepted submission, if any.
    #[must_use]
    pub fn last_submission(&self) -> Option<(TestId, SubmissionPayload)> {
        self.lock().submissions.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        // Mutex poisoning cannot happen here: no panics while holding it.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ExamGateway for InMemoryGateway {
    async fn fetch_paper(&self, test: TestId) -> Result<PaperFetch, ApiError> {
        let state = self.lock();
        state.papers.get(&test).cloned().ok_or(ApiError::NotFound)
    }

    async fn submit(
        &self,
        test: TestId,
        payload: &SubmissionPayload,
    ) -> Result<GradeReceipt, ApiError> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.attempts += 1;
        if state.fail_next_submissions > 0 {
            state.fail_next_submissions -= 1;
            return Err(ApiError::Transport("connection reset".to_string()));
        }

        state.submissions.push((test, payload.clone()));
        let result_id = ResultId::new(format!("result-{}", state.submissions.len()));
        Ok(GradeReceipt { result_id })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Question, QuestionId};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn build_paper(test: u64) -> ExamPaper {
        let question = Question::new(QuestionId::new(1), "reading", json!({"passage": "p"}), 5);
        ExamPaper::new(TestId::new(test), "Aptitude", 10, vec![question], None).unwrap()
    }

    fn build_payload() -> SubmissionPayload {
        let mut answers = BTreeMap::new();
        answers.insert(QuestionId::new(1), "an answer".to_string());
        SubmissionPayload {
            answers,
            violation_count: 0,
            disqualified: false,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn serves_scripted_paper() {
        let gateway = InMemoryGateway::new();
        gateway.put_paper(build_paper(1));

        match gateway.fetch_paper(TestId::new(1)).await.unwrap() {
            PaperFetch::Paper(paper) => assert_eq!(paper.title(), "Aptitude"),
            other => panic!("expected paper, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_test_is_not_found() {
        let gateway = InMemoryGateway::new();
        let err = gateway.fetch_paper(TestId::new(9)).await.unwrap_err();
        assert_eq!(err, ApiError::NotFound);
    }

    #[tokio::test]
    async fn already_completed_short_circuits() {
        let gateway = InMemoryGateway::new();
        gateway.mark_completed(TestId::new(2), ResultId::new("r1"));

        match gateway.fetch_paper(TestId::new(2)).await.unwrap() {
            PaperFetch::AlreadyCompleted { result_id } => {
                assert_eq!(result_id.as_str(), "r1");
            }
            other => panic!("expected short circuit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn records_submissions_and_counts_failures() {
        let gateway = InMemoryGateway::new();
        gateway.fail_next_submissions(1);
        let payload = build_payload();

        let err = gateway.submit(TestId::new(1), &payload).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(gateway.submission_count(), 0);

        let receipt = gateway.submit(TestId::new(1), &payload).await.unwrap();
        assert_eq!(receipt.result_id.as_str(), "result-1");
        assert_eq!(gateway.attempt_count(), 2);
        assert_eq!(gateway.submission_count(), 1);

        let (test, recorded) = gateway.last_submission().unwrap();
        assert_eq!(test, TestId::new(1));
        assert_eq!(recorded, payload);
    }
}
