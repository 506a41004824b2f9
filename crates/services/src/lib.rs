#![forbid(unsafe_code)]

pub mod controller;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod gate;
pub mod loader;
pub mod monitor;
pub mod notify;
pub mod runtime;
pub mod timer;

pub use exam_core::Clock;

pub use controller::{ExamController, LoadReport};
pub use coordinator::{PendingSubmission, SubmissionCoordinator, SubmissionTrigger};
pub use error::{ControllerError, LoadError, SubmitError};
pub use events::{EventKind, EventSink, EventSource, ProctorEvent, Subscription, SyntheticEventSource};
pub use gate::{FullscreenControl, FullscreenGate, FullscreenUnavailable, GateSignal, GateState, UnsupportedFullscreen};
pub use loader::{LoadOutcome, SessionLoader};
pub use monitor::{Escalation, ViolationMonitor};
pub use notify::{ChannelNotifier, Notice, Notifier, Severity};
pub use runtime::{drive, ExamCommand, RunOutcome};
pub use timer::CountdownTimer;
