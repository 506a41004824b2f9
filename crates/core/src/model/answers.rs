use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("failed to encode structured answer: {0}")]
    Encode(#[from] serde_json::Error),
}

//
// ─── ANSWER SHEET ──────────────────────────────────────────────────────────────
//

/// In-memory ledger of question responses for the active session.
///
/// Values are stored exactly as they will be submitted: free text for plain
/// questions, or a JSON-serialized blank→choice map for multi-blank questions.
/// `record` is an unconditional overwrite; the last write before submission
/// wins, and a missing entry means "unanswered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    entries: BTreeMap<QuestionId, String>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the response for a question.
    ///
    /// No validation of the value shape happens here; that is the question
    /// renderer's concern.
    pub fn record(&mut self, question: QuestionId, value: impl Into<String>) {
        self.entries.insert(question, value.into());
    }

    /// Record a multi-blank response as a JSON-serialized blank→choice map.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::Encode` if the map cannot be serialized.
    pub fn record_blanks(
        &mut self,
        question: QuestionId,
        blanks: &BTreeMap<String, String>,
    ) -> Result<(), AnswerError> {
        let encoded = serde_json::to_string(blanks)?;
        self.entries.insert(question, encoded);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<&str> {
        self.entries.get(&question).map(String::as_str)
    }

    #[must_use]
    pub fn is_answered(&self, question: QuestionId) -> bool {
        self.entries.contains_key(&question)
    }

    /// Number of questions with a recorded response.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full copy of the current responses, keyed by question id.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<QuestionId, String> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &str)> {
        self.entries.iter().map(|(id, v)| (*id, v.as_str()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_previous_value() {
        let mut sheet = AnswerSheet::new();
        let q = QuestionId::new(1);

        sheet.record(q, "first draft");
        sheet.record(q, "final answer");

        assert_eq!(sheet.get(q), Some("final answer"));
        assert_eq!(sheet.answered_count(), 1);
    }

    #[test]
    fn missing_entry_means_unanswered() {
        let sheet = AnswerSheet::new();
        assert!(!sheet.is_answered(QuestionId::new(9)));
        assert_eq!(sheet.get(QuestionId::new(9)), None);
    }

    #[test]
    fn blanks_serialize_to_json_map() {
        let mut sheet = AnswerSheet::new();
        let q = QuestionId::new(4);
        let mut blanks = BTreeMap::new();
        blanks.insert("blank_1".to_string(), "b".to_string());
        blanks.insert("blank_2".to_string(), "d".to_string());

        sheet.record_blanks(q, &blanks).unwrap();

        let stored = sheet.get(q).unwrap();
        let decoded: BTreeMap<String, String> = serde_json::from_str(stored).unwrap();
        assert_eq!(decoded, blanks);
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let mut sheet = AnswerSheet::new();
        let q = QuestionId::new(2);
        sheet.record(q, "kept");

        let snap = sheet.snapshot();
        sheet.record(q, "changed after snapshot");

        assert_eq!(snap.get(&q).map(String::as_str), Some("kept"));
        assert_eq!(sheet.get(q), Some("changed after snapshot"));
    }
}
