use super::Config;
use super::schema::Locale;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("POSTGUARD_API_URL")
            && !url.is_empty()
        {
            self.service.base_url = url;
        }

        if let Ok(assistant) = std::env::var("POSTGUARD_ASSISTANT_ID")
            && !assistant.is_empty()
        {
            self.service.assistant_id = Some(assistant);
        }

        if let Ok(conversation) = std::env::var("POSTGUARD_CONVERSATION_ID")
            && !conversation.is_empty()
        {
            self.session.conversation_id = Some(conversation);
        }

        if let Ok(locale_str) = std::env::var("POSTGUARD_LOCALE")
            && let Ok(locale) = locale_str.parse::<Locale>()
        {
            self.feedback.locale = locale;
        }
    }
}
