//! User-facing feedback surface.
//!
//! The gate reports progress and outcomes through [`FeedbackSink`]; how
//! those are rendered (toast, log line, status bar) is up to the sink.

pub mod log;
pub mod messages;

pub use self::log::LogFeedback;
pub use messages::Messages;

use crate::verdict::VerdictLevel;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Safe,
    Caution,
    Block,
}

impl From<VerdictLevel> for Severity {
    fn from(level: VerdictLevel) -> Self {
        match level {
            VerdictLevel::Safe => Self::Safe,
            VerdictLevel::Caution => Self::Caution,
            VerdictLevel::Block => Self::Block,
        }
    }
}

/// Colours a toast renderer should use for a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub border: &'static str,
}

impl Severity {
    pub fn palette(self) -> Palette {
        match self {
            Self::Safe => Palette {
                background: "#ffffff",
                text: "#000000",
                border: "#000000",
            },
            Self::Caution => Palette {
                background: "#ffc107",
                text: "#212529",
                border: "#d39e00",
            },
            Self::Block => Palette {
                background: "#dc3545",
                text: "#ffffff",
                border: "#b02a37",
            },
        }
    }
}

/// Token for an in-flight progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressHandle(pub u64);

/// Fire-and-forget display surface.
pub trait FeedbackSink: Send + Sync {
    fn display(&self, message: &str, severity: Severity);

    fn show_progress(&self, message: &str) -> ProgressHandle;

    /// Replace a progress indicator with a final message.
    fn resolve_progress(&self, handle: ProgressHandle, message: &str, severity: Severity);

    /// Remove a progress indicator without a final message.
    fn dismiss(&self, _handle: ProgressHandle) {}
}
