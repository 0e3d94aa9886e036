//! Wires the page scanner, gates and session store together for one page.

use crate::config::Config;
use crate::feedback::{FeedbackSink, Messages};
use crate::gate::{Gate, GateContext, GateFactory};
use crate::page::{ControlRegistry, ElementId, HostPage, PageScanner};
use crate::session::SessionStore;
use crate::verdict::RiskAssessor;
use std::sync::Arc;

pub struct Engine {
    scanner: Arc<PageScanner>,
    gates: Arc<GateFactory>,
    session: Arc<SessionStore>,
    assessor: Arc<dyn RiskAssessor>,
}

impl Engine {
    pub fn new(
        config: &Config,
        page: Arc<dyn HostPage>,
        assessor: Arc<dyn RiskAssessor>,
        session: Arc<SessionStore>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        let ctx = Arc::new(GateContext {
            page: Arc::clone(&page),
            assessor: Arc::clone(&assessor),
            session: Arc::clone(&session),
            feedback,
            messages: Messages::new(config.feedback.locale),
            show_progress: config.feedback.show_progress,
        });
        let gates = Arc::new(GateFactory::new(ctx));
        let scanner = Arc::new(PageScanner::new(
            page,
            config.rules.iter().cloned(),
            Arc::new(ControlRegistry::new()),
            gates.clone(),
        ));

        Self {
            scanner,
            gates,
            session,
            assessor,
        }
    }

    /// Make sure a conversation exists before the first assessment.
    ///
    /// Failure is logged and tolerated; gates fail closed until the session
    /// is complete.
    pub async fn bootstrap(&self) -> Option<String> {
        match self
            .session
            .ensure_conversation(self.assessor.as_ref())
            .await
        {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(
                    cause = err.code(),
                    error = %err,
                    "Could not establish a conversation; submissions will be withheld"
                );
                None
            }
        }
    }

    /// Start watching the page. Returns the number of controls found by the
    /// initial sweep.
    pub fn start(&self) -> usize {
        let admitted = self.scanner.start();
        tracing::info!(admitted, "Post guard active");
        admitted
    }

    pub fn gates(&self) -> Vec<Gate> {
        self.gates.gates()
    }

    pub fn gate_for(&self, control: ElementId) -> Option<Gate> {
        self.gates.gate_for(control)
    }

    pub fn registry(&self) -> &Arc<ControlRegistry> {
        self.scanner.registry()
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Wait until every gate is idle.
    pub async fn settled(&self) {
        for gate in self.gates() {
            gate.settled().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssessmentError;
    use crate::feedback::LogFeedback;
    use crate::page::MemoryPage;
    use crate::session::{ResolvedSession, Session};
    use crate::verdict::{Draft, Verdict};
    use async_trait::async_trait;

    struct FixedService {
        thread: Result<String, ()>,
    }

    #[async_trait]
    impl RiskAssessor for FixedService {
        async fn open_conversation(&self, _base_url: &str) -> Result<String, AssessmentError> {
            self.thread
                .clone()
                .map_err(|()| AssessmentError::Malformed("no thread".into()))
        }

        async fn assess(
            &self,
            _draft: &Draft,
            _session: &ResolvedSession,
        ) -> Result<Verdict, AssessmentError> {
            Ok(Verdict::safe())
        }
    }

    fn engine_with(page: Arc<MemoryPage>, thread: Result<String, ()>) -> Engine {
        let config = Config::default();
        Engine::new(
            &config,
            page,
            Arc::new(FixedService { thread }),
            Arc::new(SessionStore::in_memory(Session {
                service_base_url: Some(config.service.base_url.clone()),
                assistant_id: Some("assistant".into()),
                conversation_id: None,
            })),
            Arc::new(LogFeedback::new()),
        )
    }

    #[tokio::test]
    async fn bootstrap_caches_conversation() {
        let engine = engine_with(Arc::new(MemoryPage::new()), Ok("t-1".into()));
        assert_eq!(engine.bootstrap().await.as_deref(), Some("t-1"));
        assert_eq!(
            engine.session().get().conversation_id.as_deref(),
            Some("t-1")
        );
    }

    #[test]
    fn bootstrap_failure_is_tolerated() {
        let engine = engine_with(Arc::new(MemoryPage::new()), Err(()));
        assert!(tokio_test::block_on(engine.bootstrap()).is_none());
        assert!(engine.session().get().conversation_id.is_none());
    }

    #[test]
    fn start_hooks_default_x_controls() {
        let page = Arc::new(
            MemoryPage::from_html(
                r#"<div data-testid="tweetTextarea_0">hi</div>
                   <button data-testid="tweetButtonInline">Post</button>"#,
            )
            .unwrap(),
        );
        let engine = engine_with(page.clone(), Ok("t".into()));

        assert_eq!(engine.start(), 1);
        assert_eq!(engine.registry().len(), 1);

        let button = page.query_selector("button").unwrap();
        assert!(engine.gate_for(button).is_some());
        assert_eq!(engine.gates()[0].control().rule().platform, "x");
    }
}
