use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.postguard/config.toml`, creating it with defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let postguard_dir = home.join(".postguard");

        if !postguard_dir.exists() {
            fs::create_dir_all(&postguard_dir).context("Failed to create .postguard directory")?;
        }

        Self::load_from(&postguard_dir.join("config.toml"))
    }

    /// Load the config at `config_path`, writing defaults there if it is missing.
    ///
    /// Env overrides apply to the returned value only; use
    /// [`Config::update_file`] to change what is stored.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            Self::read_file(config_path)?
        } else {
            let config = Self::defaults_at(config_path);
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `edit` to the file at `config_path` as stored and save it.
    ///
    /// Starts from defaults when the file does not exist yet.
    pub fn update_file(config_path: &Path, edit: impl FnOnce(&mut Config)) -> Result<()> {
        let mut stored = if config_path.exists() {
            Self::read_file(config_path)?
        } else {
            Self::defaults_at(config_path)
        };
        edit(&mut stored);
        stored.save()
    }

    fn read_file(config_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_path = config_path.to_path_buf();
        Ok(config)
    }

    fn defaults_at(config_path: &Path) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_env::EnvScope;

    #[test]
    fn load_from_creates_default_file() {
        let _env = EnvScope::clean();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.config_path, path);
        assert_eq!(config.rules.len(), 2);
    }

    #[test]
    fn save_then_load_preserves_session_fields() {
        let _env = EnvScope::clean();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load_from(&path).unwrap();
        config.service.assistant_id = Some("assistant-42".into());
        config.session.conversation_id = Some("thread-42".into());
        config.save().unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.service.assistant_id.as_deref(), Some("assistant-42"));
        assert_eq!(reloaded.session.conversation_id.as_deref(), Some("thread-42"));
    }

    #[test]
    fn load_from_rejects_invalid_rules() {
        let _env = EnvScope::clean();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[[rules]]\ncontrol_selector = \"[broken\"\ndraft_source_selector = \"textarea\"\n",
        )
        .unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("rules.control_selector"));
    }

    #[test]
    fn update_file_keeps_env_overrides_out_of_the_file() {
        let mut env = EnvScope::clean();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::load_from(&path).unwrap();

        env.set("POSTGUARD_API_URL", "http://10.9.9.9:1")
            .set("POSTGUARD_LOCALE", "ja");
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.service.base_url, "http://10.9.9.9:1");

        Config::update_file(&path, |stored| {
            stored.session.conversation_id = Some("thread-7".into());
        })
        .unwrap();

        let stored: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.service.base_url, "http://127.0.0.1:2024");
        assert_eq!(stored.feedback.locale, crate::config::Locale::En);
        assert_eq!(stored.session.conversation_id.as_deref(), Some("thread-7"));
    }

    #[test]
    fn update_file_creates_missing_file() {
        let _env = EnvScope::clean();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::update_file(&path, |stored| {
            stored.service.assistant_id = Some("assistant-1".into());
        })
        .unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.service.assistant_id.as_deref(), Some("assistant-1"));
        assert_eq!(reloaded.rules.len(), 2);
    }
}
