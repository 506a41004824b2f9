use std::sync::Arc;
use tracing::{info, warn};

use api::{ExamGateway, PaperFetch};
use exam_core::model::{ExamPaper, ResultId, TestId};

use crate::error::LoadError;

/// Outcome of loading a test for an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The user already finished this test; route straight to the result.
    AlreadyCompleted(ResultId),
    /// A paper is ready to sit.
    Ready(ExamPaper),
}

/// Fetches the paper that seeds a session.
///
/// Nothing is cached and nothing survives a reload: a page reload during an
/// active attempt loses all recorded answers and violations, by design.
/// Callers should warn the user before letting them navigate away.
#[derive(Clone)]
pub struct SessionLoader {
    gateway: Arc<dyn ExamGateway>,
}

impl SessionLoader {
    #[must_use]
    pub fn new(gateway: Arc<dyn ExamGateway>) -> Self {
        Self { gateway }
    }

    /// Load the paper for `test`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` when the fetch fails or the test is unavailable;
    /// the caller aborts to the dashboard with `LoadError::user_message`.
    pub async fn load(&self, test: TestId) -> Result<LoadOutcome, LoadError> {
        match self.gateway.fetch_paper(test).await {
            Ok(PaperFetch::AlreadyCompleted { result_id }) => {
                info!(%test, result = %result_id, "test already completed, short-circuiting");
                Ok(LoadOutcome::AlreadyCompleted(result_id))
            }
            Ok(PaperFetch::Paper(paper)) => {
                info!(
                    %test,
                    title = paper.title(),
                    questions = paper.questions().len(),
                    duration_mins = paper.duration_mins(),
                    randomized = paper.session_id().is_some(),
                    "paper loaded"
                );
                Ok(LoadOutcome::Ready(paper))
            }
            Err(err) => {
                warn!(%test, error = %err, "failed to load paper");
                Err(err.into())
            }
        }
    }
}
