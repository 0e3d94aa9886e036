use crate::error::ConfigError;
use crate::page::rules::{ObservationRule, default_rules};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(default = "default_rules")]
    pub rules: Vec<ObservationRule>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            log_level: default_log_level(),
            service: ServiceConfig::default(),
            session: SessionConfig::default(),
            feedback: FeedbackConfig::default(),
            rules: default_rules(),
        }
    }
}

// ── Risk assessment service ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the risk assessment service (default: http://127.0.0.1:2024)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Assistant (graph) identifier; changes whenever the backend is redeployed
    #[serde(default)]
    pub assistant_id: Option<String>,
    /// Whole-request timeout, covering the synchronous run wait
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:2024".into()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            assistant_id: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

// ── Conversation session ─────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Conversation (thread) id, created once via `postguard init`
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// ── Feedback ─────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub locale: Locale,
    /// Show a "checking" indicator while the assessment is in flight
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            show_progress: true,
        }
    }
}

// ── Validation ───────────────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.service.base_url)?;

        if self.service.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "service.timeout_secs",
                message: "must be greater than zero".into(),
            });
        }
        if self.service.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "service.connect_timeout_secs",
                message: "must be greater than zero".into(),
            });
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid {
                field: "log_level",
                message: format!("unknown level `{}`", self.log_level),
            });
        }

        if self.rules.is_empty() {
            return Err(ConfigError::Invalid {
                field: "rules",
                message: "at least one observation rule is required".into(),
            });
        }
        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

pub fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|err| ConfigError::Invalid {
        field: "service.base_url",
        message: format!("`{raw}`: {err}"),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            field: "service.base_url",
            message: format!("unsupported scheme `{other}`"),
        }),
    }
}
