use crate::config::Locale;
use crate::verdict::Verdict;

/// Localized feedback text.
///
/// Messages never carry technical detail; causes go to the logs instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn checking(&self) -> String {
        t!("feedback.checking", locale = self.locale.code()).into_owned()
    }

    pub fn allowed(&self, corrected: bool) -> String {
        let locale = self.locale.code();
        if corrected {
            t!("feedback.allowed_corrected", locale = locale).into_owned()
        } else {
            t!("feedback.allowed", locale = locale).into_owned()
        }
    }

    /// Advisory tone: headline, then suggestion and rewrite when present.
    pub fn caution(&self, verdict: &Verdict) -> String {
        let locale = self.locale.code();
        let mut lines = vec![t!("feedback.caution", locale = locale).into_owned()];
        if let Some(suggestion) = &verdict.suggestion {
            lines.push(t!("feedback.suggestion", locale = locale, suggestion = suggestion).into_owned());
        }
        if let Some(correction) = &verdict.corrected_text {
            lines.push(t!("feedback.correction", locale = locale, correction = correction).into_owned());
        }
        lines.join("\n")
    }

    /// Refusal tone: headline, then reason and rewrite when present.
    pub fn blocked(&self, verdict: &Verdict) -> String {
        let locale = self.locale.code();
        let mut lines = vec![t!("feedback.blocked", locale = locale).into_owned()];
        if let Some(reason) = &verdict.reason {
            lines.push(t!("feedback.reason", locale = locale, reason = reason).into_owned());
        }
        if let Some(correction) = &verdict.corrected_text {
            lines.push(t!("feedback.correction", locale = locale, correction = correction).into_owned());
        }
        lines.join("\n")
    }

    pub fn failed(&self) -> String {
        t!("feedback.failed", locale = self.locale.code()).into_owned()
    }

    pub fn not_configured(&self) -> String {
        t!("feedback.not_configured", locale = self.locale.code()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::VerdictLevel;

    #[test]
    fn blocked_message_includes_reason_and_correction() {
        let verdict = Verdict::with_level(VerdictLevel::Block)
            .because("contains an insult")
            .corrected("I disagree with you.");
        let message = Messages::new(Locale::En).blocked(&verdict);

        assert!(message.starts_with("This post was not sent"));
        assert!(message.contains("Reason: contains an insult"));
        assert!(message.contains("Suggested rewrite: I disagree with you."));
    }

    #[test]
    fn caution_message_includes_suggestion_not_reason() {
        let verdict = Verdict::with_level(VerdictLevel::Caution)
            .because("sarcasm")
            .suggesting("Say it plainly");
        let message = Messages::new(Locale::En).caution(&verdict);

        assert!(message.contains("Please review it"));
        assert!(message.contains("Suggestion: Say it plainly"));
        assert!(!message.contains("sarcasm"));
    }

    #[test]
    fn absent_fields_are_omitted() {
        let message = Messages::new(Locale::En).blocked(&Verdict::with_level(VerdictLevel::Block));
        assert_eq!(message.lines().count(), 1);
    }

    #[test]
    fn japanese_locale_uses_japanese_text() {
        let messages = Messages::new(Locale::Ja);
        assert_eq!(messages.failed(), "エラーが発生しました。もう一度お試しください。");

        let verdict = Verdict::with_level(VerdictLevel::Caution).corrected("やさしい表現");
        assert!(messages.caution(&verdict).contains("訂正案：やさしい表現"));
    }

    #[test]
    fn allowed_message_mentions_correction_only_when_applied() {
        let messages = Messages::new(Locale::En);
        assert!(messages.allowed(true).contains("correction"));
        assert!(!messages.allowed(false).contains("correction"));
    }
}
