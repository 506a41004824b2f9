use thiserror::Error;

use crate::model::ids::{SessionId, TestId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PaperError {
    #[error("paper title cannot be empty")]
    EmptyTitle,

    #[error("paper duration must be > 0 minutes")]
    ZeroDuration,

    #[error("paper contains no questions")]
    NoQuestions,
}

//
// ─── EXAM PAPER ────────────────────────────────────────────────────────────────
//

/// The served question set for one test attempt, as returned by the backend.
///
/// For template-based tests the backend generates a fresh randomized set per
/// attempt and issues a `SessionId` identifying it; that id travels with the
/// paper into the session and back out on submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamPaper {
    test_id: TestId,
    title: String,
    duration_mins: u32,
    questions: Vec<Question>,
    session_id: Option<SessionId>,
}

impl ExamPaper {
    /// Creates a validated paper.
    ///
    /// # Errors
    ///
    /// Returns `PaperError` if the title is blank, the duration is zero, or
    /// the question list is empty.
    pub fn new(
        test_id: TestId,
        title: impl Into<String>,
        duration_mins: u32,
        questions: Vec<Question>,
        session_id: Option<SessionId>,
    ) -> Result<Self, PaperError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(PaperError::EmptyTitle);
        }
        if duration_mins == 0 {
            return Err(PaperError::ZeroDuration);
        }
        if questions.is_empty() {
            return Err(PaperError::NoQuestions);
        }

        Ok(Self {
            test_id,
            title: title.trim().to_owned(),
            duration_mins,
            questions,
            session_id,
        })
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_mins(&self) -> u32 {
        self.duration_mins
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_mins * 60
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub(crate) fn into_parts(self) -> (TestId, String, u32, Vec<Question>, Option<SessionId>) {
        (
            self.test_id,
            self.title,
            self.duration_mins,
            self.questions,
            self.session_id,
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use serde_json::json;

    fn build_question(id: u64) -> Question {
        Question::new(QuestionId::new(id), "reading", json!({"passage": "p"}), 5)
    }

    #[test]
    fn rejects_blank_title() {
        let err = ExamPaper::new(TestId::new(1), "   ", 30, vec![build_question(1)], None)
            .unwrap_err();
        assert_eq!(err, PaperError::EmptyTitle);
    }

    #[test]
    fn rejects_zero_duration() {
        let err =
            ExamPaper::new(TestId::new(1), "Aptitude", 0, vec![build_question(1)], None)
                .unwrap_err();
        assert_eq!(err, PaperError::ZeroDuration);
    }

    #[test]
    fn rejects_empty_question_set() {
        let err = ExamPaper::new(TestId::new(1), "Aptitude", 30, Vec::new(), None).unwrap_err();
        assert_eq!(err, PaperError::NoQuestions);
    }

    #[test]
    fn trims_title_and_converts_duration() {
        let paper = ExamPaper::new(
            TestId::new(1),
            "  Verbal Reasoning  ",
            45,
            vec![build_question(1), build_question(2)],
            Some(SessionId::new("abc123")),
        )
        .unwrap();

        assert_eq!(paper.title(), "Verbal Reasoning");
        assert_eq!(paper.duration_secs(), 2700);
        assert_eq!(paper.questions().len(), 2);
        assert_eq!(paper.session_id().map(SessionId::as_str), Some("abc123"));
    }
}
