use super::{FeedbackSink, ProgressHandle, Severity};
use std::sync::atomic::{AtomicU64, Ordering};

/// Renders feedback as tracing events. Default sink for headless runs.
#[derive(Debug, Default)]
pub struct LogFeedback {
    next_progress: AtomicU64,
}

impl LogFeedback {
    pub fn new() -> Self {
        Self::default()
    }
}

fn emit(message: &str, severity: Severity) {
    let palette = severity.palette();
    match severity {
        Severity::Safe => tracing::info!(
            severity = %severity,
            background = palette.background,
            color = palette.text,
            border = palette.border,
            "{message}"
        ),
        Severity::Caution | Severity::Block => tracing::warn!(
            severity = %severity,
            background = palette.background,
            color = palette.text,
            border = palette.border,
            "{message}"
        ),
    }
}

impl FeedbackSink for LogFeedback {
    fn display(&self, message: &str, severity: Severity) {
        emit(message, severity);
    }

    fn show_progress(&self, message: &str) -> ProgressHandle {
        let handle = ProgressHandle(self.next_progress.fetch_add(1, Ordering::Relaxed));
        tracing::info!(progress = handle.0, "{message}");
        handle
    }

    fn resolve_progress(&self, handle: ProgressHandle, message: &str, severity: Severity) {
        tracing::debug!(progress = handle.0, "Progress resolved");
        emit(message, severity);
    }

    fn dismiss(&self, handle: ProgressHandle) {
        tracing::debug!(progress = handle.0, "Progress dismissed");
    }
}
