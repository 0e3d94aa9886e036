use crate::config::Config;
use crate::error::{ConfigError, GuardError};
use crate::verdict::RiskAssessor;
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Where and as whom drafts are assessed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub service_base_url: Option<String>,
    pub assistant_id: Option<String>,
    pub conversation_id: Option<String>,
}

/// Partial update for [`SessionStore::set`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub service_base_url: Option<String>,
    pub assistant_id: Option<String>,
    pub conversation_id: Option<String>,
}

/// A session with every field present, ready for one assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub base_url: String,
    pub assistant_id: String,
    pub conversation_id: String,
}

fn present(value: Option<&String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(field))
}

impl Session {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_base_url: Some(config.service.base_url.clone()),
            assistant_id: config.service.assistant_id.clone(),
            conversation_id: config.session.conversation_id.clone(),
        }
    }

    pub fn base_url(&self) -> Result<String, ConfigError> {
        present(self.service_base_url.as_ref(), "service.base_url")
    }

    pub fn resolve(&self) -> Result<ResolvedSession, ConfigError> {
        Ok(ResolvedSession {
            base_url: self.base_url()?,
            assistant_id: present(self.assistant_id.as_ref(), "service.assistant_id")?,
            conversation_id: present(self.conversation_id.as_ref(), "session.conversation_id")?,
        })
    }

    fn apply(&mut self, patch: &SessionPatch) {
        if let Some(url) = &patch.service_base_url {
            self.service_base_url = Some(url.clone());
        }
        if let Some(assistant) = &patch.assistant_id {
            self.assistant_id = Some(assistant.clone());
        }
        if let Some(conversation) = &patch.conversation_id {
            self.conversation_id = Some(conversation.clone());
        }
    }
}

/// Process-wide session holder.
///
/// Reads are lock-free snapshots. Writes are serialized; a file-backed store
/// writes each patch to its config file before the new session becomes
/// visible, so a failed write changes nothing.
pub struct SessionStore {
    current: ArcSwap<Session>,
    writer: Mutex<()>,
    config_path: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory(session: Session) -> Self {
        Self {
            current: ArcSwap::from_pointee(session),
            writer: Mutex::new(()),
            config_path: None,
        }
    }

    /// Seed from `config` and persist later changes to its `config_path`.
    ///
    /// Only the patched fields are written; env overrides baked into
    /// `config` stay out of the file.
    pub fn file_backed(config: &Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(Session::from_config(config)),
            writer: Mutex::new(()),
            config_path: Some(config.config_path.clone()),
        }
    }

    pub fn get(&self) -> Arc<Session> {
        self.current.load_full()
    }

    pub fn set(&self, patch: SessionPatch) -> Result<Arc<Session>, ConfigError> {
        if let Some(url) = &patch.service_base_url {
            crate::config::schema::validate_base_url(url)?;
        }

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Session::clone(&self.current.load());
        next.apply(&patch);
        self.persist(&patch)?;

        let updated = Arc::new(next);
        self.current.store(Arc::clone(&updated));
        Ok(updated)
    }

    fn persist(&self, patch: &SessionPatch) -> Result<(), ConfigError> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        Config::update_file(path, |stored| {
            if let Some(url) = &patch.service_base_url {
                stored.service.base_url.clone_from(url);
            }
            if let Some(assistant) = &patch.assistant_id {
                stored.service.assistant_id = Some(assistant.clone());
            }
            if let Some(conversation) = &patch.conversation_id {
                stored.session.conversation_id = Some(conversation.clone());
            }
        })
        .map_err(|err| ConfigError::Persist(format!("{err:#}")))
    }

    /// Return the cached conversation id, asking the service for one if absent.
    pub async fn ensure_conversation(
        &self,
        service: &dyn RiskAssessor,
    ) -> Result<String, GuardError> {
        if let Some(id) = self
            .get()
            .conversation_id
            .as_ref()
            .filter(|id| !id.trim().is_empty())
        {
            return Ok(id.clone());
        }
        self.renew_conversation(service).await
    }

    /// Always open a fresh conversation and cache it.
    pub async fn renew_conversation(
        &self,
        service: &dyn RiskAssessor,
    ) -> Result<String, GuardError> {
        let base_url = self.get().base_url()?;
        let id = service.open_conversation(&base_url).await?;
        self.set(SessionPatch {
            conversation_id: Some(id.clone()),
            ..SessionPatch::default()
        })?;
        tracing::info!(conversation_id = %id, "Conversation established");
        Ok(id)
    }
}
