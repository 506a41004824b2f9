//! Shared error types for the runtime services.

use thiserror::Error;

use api::ApiError;
use exam_core::model::SessionError;

/// Errors emitted by `SessionLoader`.
///
/// A load failure aborts to the dashboard collaborator; no retry loop exists
/// at this layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl LoadError {
    /// Message to show the user when aborting to the dashboard.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Api(ApiError::Rejected { detail, .. }) => detail.clone(),
            LoadError::Api(_) => "Failed to load test. Please contact admin.".to_string(),
        }
    }
}

/// Errors emitted when a grading dispatch fails.
///
/// Always recoverable: the session moves to `Failed` with its ledger and
/// violation count untouched, and the user may retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl SubmitError {
    /// Whether retrying the submission can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Api(_))
    }
}

/// Errors emitted by `ExamController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("no session has been loaded")]
    NotLoaded,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
