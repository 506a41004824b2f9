use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::QuestionId;

/// A single question as served by the backend.
///
/// The runtime treats everything beyond identity and marks as opaque: the
/// `kind` discriminates rendering and grading on the server side, and
/// `content` is the raw JSON blob the question renderer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    kind: String,
    content: Value,
    marks: u32,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, kind: impl Into<String>, content: Value, marks: u32) -> Self {
        Self {
            id,
            kind: kind.into(),
            content,
            marks,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn content(&self) -> &Value {
        &self.content
    }

    #[must_use]
    pub fn marks(&self) -> u32 {
        self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_exposes_identity_and_marks() {
        let q = Question::new(
            QuestionId::new(3),
            "reading",
            json!({"passage": "Lorem ipsum"}),
            10,
        );
        assert_eq!(q.id(), QuestionId::new(3));
        assert_eq!(q.kind(), "reading");
        assert_eq!(q.marks(), 10);
        assert_eq!(q.content()["passage"], "Lorem ipsum");
    }
}
