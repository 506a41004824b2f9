mod answers;
mod ids;
mod paper;
mod question;
mod session;
mod timer;
mod violation;

pub use answers::{AnswerError, AnswerSheet};
pub use ids::{ParseIdError, QuestionId, ResultId, SessionId, TestId};
pub use paper::{ExamPaper, PaperError};
pub use question::Question;
pub use session::{
    ExamProgress, ExamSession, SessionError, SessionStatus, SubmissionPayload, TickOutcome,
};
pub use timer::{LOW_TIME_SECS, TimerState};
pub use violation::{
    DEFAULT_VIOLATION_THRESHOLD, ViolationCounter, ViolationError, ViolationKind,
    ViolationOutcome,
};
