use crate::error::ConfigError;
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// Declarative description of one kind of submission control.
///
/// Rules are loaded once at startup and never change afterwards. When an
/// element matches several rules, the first one in declaration order wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRule {
    /// CSS selector identifying the submit control (button, link, ...).
    pub control_selector: String,
    /// CSS selector of the element holding the draft text.
    pub draft_source_selector: String,
    /// Short tag naming the host platform, used in logs only.
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    "generic".into()
}

impl ObservationRule {
    pub fn new(
        control_selector: impl Into<String>,
        draft_source_selector: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            control_selector: control_selector.into(),
            draft_source_selector: draft_source_selector.into(),
            platform: platform.into(),
        }
    }

    /// Both selectors must be valid CSS.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_selector("rules.control_selector", &self.control_selector)?;
        check_selector("rules.draft_source_selector", &self.draft_source_selector)
    }
}

fn check_selector(field: &'static str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            message: "selector is empty".into(),
        });
    }
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|err| ConfigError::Invalid {
            field,
            message: format!("`{selector}` is not a valid selector: {err:?}"),
        })
}

const X_DRAFT_SOURCE: &str = r#"[data-testid="tweetTextarea_0"]"#;

/// Rule table used when the config does not define one: the X (Twitter)
/// compose dialog button and the inline reply/compose button.
pub fn default_rules() -> Vec<ObservationRule> {
    vec![
        ObservationRule::new(r#"[data-testid="tweetButton"]"#, X_DRAFT_SOURCE, "x"),
        ObservationRule::new(r#"[data-testid="tweetButtonInline"]"#, X_DRAFT_SOURCE, "x"),
    ]
}
