//! HTTP client for the risk assessment service.
//!
//! The service is a thread/run API: a conversation ("thread") is opened once,
//! then every draft is judged by a run on that thread. Runs are awaited with
//! the blocking `runs/wait` endpoint so a call only returns once the verdict
//! is final.

use super::types::{Draft, RunInput, RunRequest, RunResponse, ThreadResponse, Verdict};
use crate::config::ServiceConfig;
use crate::error::AssessmentError;
use crate::session::ResolvedSession;
use crate::utils::text::{log_preview, truncate_with_ellipsis};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Seam between the gate and whatever produces verdicts.
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    /// Open a new conversation and return its identifier.
    async fn open_conversation(&self, base_url: &str) -> Result<String, AssessmentError>;

    /// Judge one draft. Exactly one request, no retries.
    async fn assess(
        &self,
        draft: &Draft,
        session: &ResolvedSession,
    ) -> Result<Verdict, AssessmentError>;
}

pub fn build_service_client(config: &ServiceConfig) -> Client {
    build_service_client_with_timeouts(config.timeout_secs, config.connect_timeout_secs)
}

pub fn build_service_client_with_timeouts(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub struct VerdictClient {
    client: Client,
}

impl VerdictClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            client: build_service_client(config),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, AssessmentError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| AssessmentError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url, status = status.as_u16(), "Risk service returned an error status");
            return Err(AssessmentError::Status {
                status: status.as_u16(),
                body: truncate_with_ellipsis(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }

        Ok(response)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

#[async_trait]
impl RiskAssessor for VerdictClient {
    async fn open_conversation(&self, base_url: &str) -> Result<String, AssessmentError> {
        let url = join_url(base_url, "threads");
        let response = self.post_json(&url, &serde_json::json!({})).await?;
        let thread: ThreadResponse = response
            .json()
            .await
            .map_err(|err| AssessmentError::Malformed(format!("thread response: {err}")))?;

        thread
            .thread_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AssessmentError::Malformed("missing `thread_id`".into()))
    }

    async fn assess(
        &self,
        draft: &Draft,
        session: &ResolvedSession,
    ) -> Result<Verdict, AssessmentError> {
        let url = join_url(
            &session.base_url,
            &format!("threads/{}/runs/wait", session.conversation_id),
        );
        let request = RunRequest {
            assistant_id: &session.assistant_id,
            input: RunInput {
                user_request: draft.text(),
            },
        };

        tracing::debug!(
            url = %url,
            draft_chars = draft.char_count(),
            preview = %log_preview(draft.text(), 24),
            "Submitting draft for assessment"
        );

        let response = self.post_json(&url, &request).await?;
        let run: RunResponse = response
            .json()
            .await
            .map_err(|err| AssessmentError::Malformed(format!("run response: {err}")))?;
        let verdict = Verdict::try_from(run)?;

        tracing::info!(level = %verdict.level, "Assessment completed");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::VerdictLevel;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(server: &MockServer) -> ResolvedSession {
        ResolvedSession {
            base_url: server.uri(),
            assistant_id: "assistant-1".into(),
            conversation_id: "thread-1".into(),
        }
    }

    fn client() -> VerdictClient {
        VerdictClient::with_client(build_service_client_with_timeouts(5, 5))
    }

    #[test]
    fn join_url_trims_trailing_slash() {
        assert_eq!(
            join_url("http://127.0.0.1:2024/", "threads"),
            "http://127.0.0.1:2024/threads"
        );
        assert_eq!(join_url("http://h", "threads"), "http://h/threads");
    }

    #[tokio::test]
    async fn open_conversation_returns_thread_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(body_json(serde_json::json!({})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"thread_id": "t-9"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client().open_conversation(&server.uri()).await.unwrap();
        assert_eq!(id, "t-9");
    }

    #[tokio::test]
    async fn open_conversation_without_id_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = client().open_conversation(&server.uri()).await.unwrap_err();
        assert_eq!(err.code(), "assessment.malformed");
    }

    #[tokio::test]
    async fn assess_posts_assistant_and_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thread-1/runs/wait"))
            .and(body_json(serde_json::json!({
                "assistant_id": "assistant-1",
                "input": {"user_request": "hello world"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user_request": "hello world",
                "response": {
                    "level": "warning",
                    "reason": "tone",
                    "suggestion": "soften it",
                    "corrected_text": "hello, world"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let verdict = client()
            .assess(&Draft::new("hello world"), &session_for(&server))
            .await
            .unwrap();

        assert_eq!(verdict.level, VerdictLevel::Caution);
        assert_eq!(verdict.reason.as_deref(), Some("tone"));
        assert_eq!(verdict.suggestion.as_deref(), Some("soften it"));
        assert_eq!(verdict.corrected_text.as_deref(), Some("hello, world"));
    }

    #[tokio::test]
    async fn assess_maps_error_status_and_truncates_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thread-1/runs/wait"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(1_000)))
            .mount(&server)
            .await;

        let err = client()
            .assess(&Draft::new("hi"), &session_for(&server))
            .await
            .unwrap_err();

        match err {
            AssessmentError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.chars().count() <= MAX_ERROR_BODY_CHARS + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn assess_rejects_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thread-1/runs/wait"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client()
            .assess(&Draft::new("hi"), &session_for(&server))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "assessment.malformed");
    }

    #[tokio::test]
    async fn assess_reports_transport_failure() {
        let session = ResolvedSession {
            // Port 9 (discard) on localhost is closed in test environments.
            base_url: "http://127.0.0.1:9".into(),
            assistant_id: "a".into(),
            conversation_id: "t".into(),
        };
        let err = client()
            .assess(&Draft::new("hi"), &session)
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Transport { .. }));
    }
}
