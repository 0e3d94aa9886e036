#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use postguard::error::AssessmentError;
use postguard::feedback::{FeedbackSink, ProgressHandle, Severity};
use postguard::page::MemoryPage;
use postguard::session::{ResolvedSession, Session, SessionStore};
use postguard::verdict::{Draft, RiskAssessor, Verdict};
use postguard::{Config, Engine};

pub const COMPOSER: &str = r#"
<main>
  <div class="composer">
    <div data-testid="tweetTextarea_0" contenteditable="true">hello world</div>
    <button data-testid="tweetButton">Post</button>
  </div>
</main>
"#;

/// Assessor that replays queued replies and records every draft it sees.
#[derive(Default)]
pub struct ScriptedAssessor {
    replies: Mutex<VecDeque<Result<Verdict, AssessmentError>>>,
    drafts: Mutex<Vec<String>>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedAssessor {
    pub fn replying(replies: impl IntoIterator<Item = Result<Verdict, AssessmentError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Every `assess` call waits for a `notify_one` on `hold`.
    pub fn held(hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    pub fn drafts(&self) -> Vec<String> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskAssessor for ScriptedAssessor {
    async fn open_conversation(&self, _base_url: &str) -> Result<String, AssessmentError> {
        Ok("thread-test".into())
    }

    async fn assess(
        &self,
        draft: &Draft,
        _session: &ResolvedSession,
    ) -> Result<Verdict, AssessmentError> {
        self.drafts.lock().unwrap().push(draft.text().to_string());
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Verdict::safe()))
    }
}

/// Sink that keeps every final message in order.
#[derive(Default)]
pub struct RecordingFeedback {
    messages: Mutex<Vec<(String, Severity)>>,
    progress: AtomicU64,
    dismissed: AtomicU64,
}

impl RecordingFeedback {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(String, Severity)> {
        self.messages.lock().unwrap().last().cloned()
    }

    pub fn progress_shown(&self) -> u64 {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn dismissed(&self) -> u64 {
        self.dismissed.load(Ordering::SeqCst)
    }
}

impl FeedbackSink for RecordingFeedback {
    fn display(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }

    fn show_progress(&self, _message: &str) -> ProgressHandle {
        ProgressHandle(self.progress.fetch_add(1, Ordering::SeqCst))
    }

    fn resolve_progress(&self, _handle: ProgressHandle, message: &str, severity: Severity) {
        self.display(message, severity);
    }

    fn dismiss(&self, _handle: ProgressHandle) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn complete_session(base_url: &str) -> Session {
    Session {
        service_base_url: Some(base_url.to_string()),
        assistant_id: Some("assistant-test".into()),
        conversation_id: Some("thread-test".into()),
    }
}

pub struct Harness {
    pub page: Arc<MemoryPage>,
    pub feedback: Arc<RecordingFeedback>,
    pub engine: Engine,
}

impl Harness {
    pub fn new(
        html: &str,
        assessor: Arc<dyn RiskAssessor>,
        session: Session,
    ) -> Self {
        Self::with_config(&Config::default(), html, assessor, session)
    }

    pub fn with_config(
        config: &Config,
        html: &str,
        assessor: Arc<dyn RiskAssessor>,
        session: Session,
    ) -> Self {
        let page = Arc::new(MemoryPage::from_html(html).unwrap());
        let feedback = Arc::new(RecordingFeedback::default());
        let engine = Engine::new(
            config,
            page.clone(),
            assessor,
            Arc::new(SessionStore::in_memory(session)),
            feedback.clone(),
        );
        engine.start();
        Self {
            page,
            feedback,
            engine,
        }
    }
}
