use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `postguard`.
///
/// Each subsystem defines its own error variant. The gate matches on these to
/// pick the user-facing message; application glue keeps using `anyhow::Result`
/// for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum GuardError {
    // ── Config / Session ─────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Risk assessment service ──────────────────────────────────────────
    #[error("assessment: {0}")]
    Assessment(#[from] AssessmentError),

    // ── Host page bindings ───────────────────────────────────────────────
    #[error("dom binding: {0}")]
    DomBinding(#[from] DomBindingError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GuardError {
    /// Stable, machine-readable cause for diagnostic output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(err) => err.code(),
            Self::Assessment(err) => err.code(),
            Self::DomBinding(err) => err.code(),
            Self::Other(_) => "other",
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required field `{0}` is not set")]
    Missing(&'static str),

    #[error("invalid `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("failed to load config: {0}")]
    Load(String),

    #[error("failed to persist config: {0}")]
    Persist(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "config.missing",
            Self::Invalid { .. } => "config.invalid",
            Self::Load(_) => "config.load",
            Self::Persist(_) => "config.persist",
            Self::Io(_) => "config.io",
        }
    }
}

// ─── Assessment errors ──────────────────────────────────────────────────────

/// Anything that prevents the risk service from producing a verdict.
///
/// The gate treats every variant as "unable to judge", never as safe.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("service responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed service response: {0}")]
    Malformed(String),

    #[error("no async runtime available to run the assessment")]
    NoRuntime,
}

impl AssessmentError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { source, .. } if source.is_timeout() => "assessment.timeout",
            Self::Transport { .. } => "assessment.transport",
            Self::Status { .. } => "assessment.status",
            Self::Malformed(_) => "assessment.malformed",
            Self::NoRuntime => "assessment.no_runtime",
        }
    }
}

// ─── Host page binding errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DomBindingError {
    #[error("no element matches draft source `{selector}`")]
    DraftSourceMissing { selector: String },

    #[error("element {0} is not attached to the document")]
    Detached(u64),

    #[error("unknown element {0}")]
    UnknownElement(u64),
}

impl DomBindingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DraftSourceMissing { .. } => "dom.draft_source_missing",
            Self::Detached(_) => "dom.detached",
            Self::UnknownElement(_) => "dom.unknown_element",
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GuardError>;
