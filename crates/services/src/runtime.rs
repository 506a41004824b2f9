//! The single event queue that runs an attempt.
//!
//! Everything that can mutate the session — ticks, proctoring events, host
//! commands, dispatch completion — is serialized through one `select!` loop,
//! so no locking is needed anywhere in the runtime. The network dispatch is
//! the only suspension point that overlaps other work: while a grading
//! request is in flight the loop keeps ticking and absorbing signals, and the
//! coordinator's entry guard keeps those from starting a second submission.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::debug;

use api::GradeReceipt;
use exam_core::model::{QuestionId, ResultId};

use crate::controller::ExamController;
use crate::coordinator::PendingSubmission;
use crate::error::SubmitError;
use crate::events::{EventKind, EventSource};
use crate::timer::CountdownTimer;

/// Host-originated actions, fed into the queue alongside platform events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    /// Record (or overwrite) a free-text answer.
    Answer {
        question: QuestionId,
        value: String,
    },
    /// Record a multi-blank answer.
    BlankAnswers {
        question: QuestionId,
        blanks: BTreeMap<String, String>,
    },
    /// Step to the next question.
    NextQuestion,
    /// Step to the previous question.
    PrevQuestion,
    /// Submit now (or retry after a failed submission).
    Submit,
    /// Re-enter fullscreen after a manual exit.
    ReenterFullscreen,
}

/// Why the run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Grading succeeded; hand the result reference to the reporting view.
    Completed(ResultId),
    /// The host dropped the command channel (navigated away) before
    /// completion. The session is discarded.
    Detached,
}

type DispatchFuture = Pin<Box<dyn Future<Output = Result<GradeReceipt, SubmitError>> + Send>>;

/// Poll the in-flight dispatch, or park forever when there is none.
async fn next_dispatch(slot: &mut Option<DispatchFuture>) -> Result<GradeReceipt, SubmitError> {
    match slot.as_mut() {
        Some(dispatch) => dispatch.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Run a started attempt to its terminal outcome.
///
/// Call after `load` and `begin` have succeeded. The countdown interval and
/// both event subscriptions live inside this call, so every exit path —
/// completion, detach, cancellation by drop — releases them; nothing keeps
/// ticking into a later session.
pub async fn drive(
    controller: &mut ExamController,
    events: &dyn EventSource,
    mut commands: mpsc::UnboundedReceiver<ExamCommand>,
) -> RunOutcome {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let _visibility = events.subscribe(EventKind::Visibility, event_tx.clone());
    let _fullscreen = events.subscribe(EventKind::Fullscreen, event_tx);

    let mut timer = CountdownTimer::start();
    let mut inflight: Option<DispatchFuture> = None;

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if let Some(pending) = controller.handle_tick() {
                    inflight = Some(Box::pin(pending.dispatch()));
                }
            }
            Some(event) = event_rx.recv() => {
                if let Some(pending) = controller.handle_event(event) {
                    inflight = Some(Box::pin(pending.dispatch()));
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    return RunOutcome::Detached;
                };
                if let Some(pending) = apply_command(controller, command) {
                    inflight = Some(Box::pin(pending.dispatch()));
                }
            }
            outcome = next_dispatch(&mut inflight) => {
                inflight = None;
                if let Some(result_id) = controller.resolve_submission(outcome) {
                    return RunOutcome::Completed(result_id);
                }
                // Failed dispatch: stay in the loop, waiting for a retry.
            }
        }
    }
}

fn apply_command(
    controller: &mut ExamController,
    command: ExamCommand,
) -> Option<PendingSubmission> {
    match command {
        ExamCommand::Answer { question, value } => {
            if let Err(err) = controller.record_answer(question, value) {
                debug!(%question, error = %err, "answer dropped");
            }
            None
        }
        ExamCommand::BlankAnswers { question, blanks } => {
            if let Err(err) = controller.record_blank_answers(question, &blanks) {
                debug!(%question, error = %err, "blank answers dropped");
            }
            None
        }
        ExamCommand::NextQuestion => {
            controller.next_question();
            None
        }
        ExamCommand::PrevQuestion => {
            controller.prev_question();
            None
        }
        ExamCommand::ReenterFullscreen => {
            controller.re_enter_fullscreen();
            None
        }
        ExamCommand::Submit => controller.request_submit(),
    }
}
