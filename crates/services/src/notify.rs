//! Structured user messaging.
//!
//! The runtime never blocks on a display surface; every user-facing message
//! is a `Notice` pushed through a `Notifier`, and the host decides how to
//! render it (banner, toast, modal).

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use exam_core::model::ViolationKind;

/// How urgently the host should surface a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A user-facing message with severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            message: message.into(),
        }
    }

    // ── canned runtime notices ─────────────────────────────────────────────

    #[must_use]
    pub fn violation_warning(kind: ViolationKind, count: u32, threshold: u32) -> Self {
        Self::warning(format!(
            "{kind}. Violation {count}/{threshold}. Your test will be auto-submitted after {threshold} violations."
        ))
    }

    #[must_use]
    pub fn final_warning(count: u32, threshold: u32) -> Self {
        Self::critical(format!(
            "FINAL WARNING: you have {count}/{threshold} violations. One more and your test will be auto-submitted."
        ))
    }

    #[must_use]
    pub fn disqualified(count: u32) -> Self {
        Self::critical(format!(
            "Disqualified: you have {count} violations. Your test is being auto-submitted."
        ))
    }

    #[must_use]
    pub fn proctoring_unavailable() -> Self {
        Self::warning(
            "Fullscreen is unavailable on this platform; the exam will proceed unprotected.",
        )
    }

    #[must_use]
    pub fn already_completed() -> Self {
        Self::info("You have already completed this test. Redirecting to your results.")
    }

    #[must_use]
    pub fn submission_failed() -> Self {
        Self::critical("Submission failed. Please check your connection and try again.")
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Consumer seam for notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that forwards notices to an unbounded channel.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Create a notifier plus the receiving end the host drains.
    #[must_use]
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // A dropped receiver means the host stopped listening; nothing to do.
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_notices_carry_counts() {
        let notice = Notice::violation_warning(ViolationKind::FocusLoss, 1, 3);
        assert_eq!(notice.severity, Severity::Warning);
        assert!(notice.message.contains("1/3"));

        let last = Notice::final_warning(2, 3);
        assert_eq!(last.severity, Severity::Critical);
        assert!(last.message.contains("2/3"));
    }

    #[test]
    fn channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(Notice::info("loaded"));
        assert_eq!(rx.try_recv().unwrap().message, "loaded");
    }
}
