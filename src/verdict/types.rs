use crate::error::AssessmentError;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Text captured from the draft source at activation time.
///
/// Lives for one gate cycle only; a new activation always takes a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    text: String,
}

impl Draft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Normalized three-value risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerdictLevel {
    Safe,
    Caution,
    Block,
}

impl VerdictLevel {
    /// Map the service's level vocabulary onto the three policy levels.
    ///
    /// Service versions disagree on naming ("warning" vs "caution", "danger"
    /// vs "block"); every known spelling is accepted, case-insensitively.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "safe" | "ok" => Some(Self::Safe),
            "warning" | "warn" | "caution" => Some(Self::Caution),
            "danger" | "block" | "blocked" => Some(Self::Block),
            _ => None,
        }
    }
}

/// The service's judgment of one draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub level: VerdictLevel,
    pub corrected_text: Option<String>,
    pub reason: Option<String>,
    pub suggestion: Option<String>,
}

impl Verdict {
    pub fn safe() -> Self {
        Self::with_level(VerdictLevel::Safe)
    }

    pub fn with_level(level: VerdictLevel) -> Self {
        Self {
            level,
            corrected_text: None,
            reason: None,
            suggestion: None,
        }
    }

    pub fn corrected(mut self, text: impl Into<String>) -> Self {
        self.corrected_text = Some(text.into());
        self
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn suggesting(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ── Wire format ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct RunRequest<'a> {
    pub assistant_id: &'a str,
    pub input: RunInput<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunInput<'a> {
    pub user_request: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunResponse {
    #[serde(default)]
    pub response: Option<WireVerdict>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVerdict {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub corrected_text: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadResponse {
    #[serde(default)]
    pub thread_id: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<RunResponse> for Verdict {
    type Error = AssessmentError;

    fn try_from(run: RunResponse) -> Result<Self, Self::Error> {
        let wire = run
            .response
            .ok_or_else(|| AssessmentError::Malformed("missing `response` object".into()))?;
        let raw_level = wire
            .level
            .ok_or_else(|| AssessmentError::Malformed("missing `response.level`".into()))?;
        let level = VerdictLevel::normalize(&raw_level)
            .ok_or_else(|| AssessmentError::Malformed(format!("unknown level `{raw_level}`")))?;

        Ok(Self {
            level,
            corrected_text: non_blank(wire.corrected_text),
            reason: non_blank(wire.reason),
            suggestion: non_blank(wire.suggestion),
        })
    }
}
