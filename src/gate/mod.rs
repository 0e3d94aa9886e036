//! Per-control interception state machine.
//!
//! ```text
//! Idle ──trusted activation──▶ AwaitingVerdict ──▶ Allowing ──▶ Idle
//!                                     │
//!                                     └──────────▶ Blocking ──▶ Idle
//! ```
//!
//! Untrusted activations (the gate's own re-dispatch) always pass through
//! untouched. Trusted activations are cancelled before any other listener
//! runs; while a cycle is in flight further trusted activations are
//! cancelled and ignored. Every path out of `AwaitingVerdict` ends in
//! `Allowing` or `Blocking`.

pub mod policy;

use crate::error::{AssessmentError, DomBindingError};
use crate::feedback::{FeedbackSink, Messages, ProgressHandle, Severity};
use crate::page::{ActivationEvent, ActivationListener, ControlBinder, ControlHandle, ElementId, HostPage};
use crate::session::SessionStore;
use crate::verdict::{Draft, RiskAssessor, VerdictLevel};
use policy::Decision;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use strum::Display;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GateState {
    Idle,
    AwaitingVerdict,
    Allowing,
    Blocking,
}

/// Result of the synchronous part of handling one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Untrusted event; left alone.
    PassThrough,
    /// Trusted event cancelled; an assessment cycle must run for this draft.
    Engaged(Draft),
    /// Trusted event cancelled and dropped because a cycle is in flight.
    Debounced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Allowed { corrected: bool },
    Withheld(VerdictLevel),
    Failed,
    Misconfigured,
    Discarded,
}

impl GateOutcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Allowed { corrected: false } => "allowed",
            Self::Allowed { corrected: true } => "allowed_corrected",
            Self::Withheld(VerdictLevel::Caution) => "withheld_caution",
            Self::Withheld(_) => "withheld_block",
            Self::Failed => "failed",
            Self::Misconfigured => "misconfigured",
            Self::Discarded => "discarded",
        }
    }
}

/// Collaborators shared by every gate on a page.
pub struct GateContext {
    pub page: Arc<dyn HostPage>,
    pub assessor: Arc<dyn RiskAssessor>,
    pub session: Arc<SessionStore>,
    pub feedback: Arc<dyn FeedbackSink>,
    pub messages: Messages,
    pub show_progress: bool,
}

struct GateInner {
    ctx: Arc<GateContext>,
    control: ControlHandle,
    state: watch::Sender<GateState>,
    assessments: AtomicU64,
}

#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    pub fn new(ctx: Arc<GateContext>, control: ControlHandle) -> Self {
        let (state, _) = watch::channel(GateState::Idle);
        Self {
            inner: Arc::new(GateInner {
                ctx,
                control,
                state,
                assessments: AtomicU64::new(0),
            }),
        }
    }

    /// Create a gate and hook it onto its control.
    pub fn attach(ctx: Arc<GateContext>, control: ControlHandle) -> Result<Self, DomBindingError> {
        let gate = Self::new(ctx, control);
        gate.inner
            .ctx
            .page
            .listen(gate.identity(), Arc::new(gate.clone()))?;
        Ok(gate)
    }

    pub fn control(&self) -> &ControlHandle {
        &self.inner.control
    }

    fn identity(&self) -> ElementId {
        self.inner.control.identity()
    }

    pub fn state(&self) -> GateState {
        *self.inner.state.borrow()
    }

    /// Number of assessments this gate has requested.
    pub fn assessments(&self) -> u64 {
        self.inner.assessments.load(Ordering::SeqCst)
    }

    /// Wait until the gate is back in `Idle`.
    pub async fn settled(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|state| *state == GateState::Idle).await;
    }

    fn transition(&self, next: GateState) {
        let previous = self.inner.state.send_replace(next);
        tracing::debug!(control = %self.identity(), from = %previous, to = %next, "Gate transition");
    }

    /// Synchronous half of activation handling.
    pub fn intercept(&self, event: &mut ActivationEvent) -> Interception {
        if !event.is_trusted() {
            tracing::trace!(control = %self.identity(), "Untrusted activation passed through");
            return Interception::PassThrough;
        }

        event.prevent_default();
        event.stop_immediate_propagation();

        let engaged = self.inner.state.send_if_modified(|state| {
            if *state == GateState::Idle {
                *state = GateState::AwaitingVerdict;
                true
            } else {
                false
            }
        });
        if !engaged {
            tracing::info!(
                control = %self.identity(),
                state = %self.state(),
                "Activation ignored while an assessment is in flight"
            );
            return Interception::Debounced;
        }

        tracing::debug!(control = %self.identity(), from = %GateState::Idle, to = %GateState::AwaitingVerdict, "Gate transition");
        Interception::Engaged(self.read_draft())
    }

    fn read_draft(&self) -> Draft {
        let page = &self.inner.ctx.page;
        let selector = &self.inner.control.rule().draft_source_selector;
        match page
            .query_selector(selector)
            .and_then(|element| page.text_content(element))
        {
            Some(text) => {
                let draft = Draft::new(text);
                if draft.is_blank() {
                    tracing::debug!(control = %self.identity(), "Draft is blank");
                }
                draft
            }
            None => {
                let err = DomBindingError::DraftSourceMissing {
                    selector: selector.clone(),
                };
                tracing::warn!(
                    control = %self.identity(),
                    cause = err.code(),
                    "Draft source not found; assessing an empty draft"
                );
                Draft::empty()
            }
        }
    }

    fn spawn_cycle(&self, draft: Draft) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let gate = self.clone();
                runtime.spawn(async move {
                    gate.run_cycle(draft).await;
                });
            }
            Err(_) => {
                let err = AssessmentError::NoRuntime;
                tracing::error!(control = %self.identity(), cause = err.code(), "Cannot run assessment");
                self.transition(GateState::Blocking);
                self.report(None, &self.inner.ctx.messages.failed(), Severity::Block);
                self.transition(GateState::Idle);
            }
        }
    }

    /// Asynchronous half: assess, apply policy, return to `Idle`.
    pub async fn run_cycle(&self, draft: Draft) -> GateOutcome {
        let outcome = self.evaluate(&draft).await;
        self.transition(GateState::Idle);
        tracing::info!(
            control = %self.identity(),
            platform = %self.inner.control.rule().platform,
            outcome = outcome.label(),
            "Gate cycle finished"
        );
        outcome
    }

    async fn evaluate(&self, draft: &Draft) -> GateOutcome {
        let ctx = &self.inner.ctx;
        let progress = ctx
            .show_progress
            .then(|| ctx.feedback.show_progress(&ctx.messages.checking()));

        let session = match ctx.session.get().resolve() {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(
                    control = %self.identity(),
                    cause = err.code(),
                    error = %err,
                    "Session incomplete; withholding submission"
                );
                self.withhold(progress, &ctx.messages.not_configured(), Severity::Block);
                return GateOutcome::Misconfigured;
            }
        };

        self.inner.assessments.fetch_add(1, Ordering::SeqCst);
        let result = ctx.assessor.assess(draft, &session).await;

        if !ctx.page.is_connected(self.identity()) {
            tracing::debug!(control = %self.identity(), "Control detached while awaiting verdict");
            if let Some(handle) = progress {
                ctx.feedback.dismiss(handle);
            }
            return GateOutcome::Discarded;
        }

        match result {
            Err(err) => {
                tracing::warn!(
                    control = %self.identity(),
                    cause = err.code(),
                    error = %err,
                    "Assessment failed; withholding submission"
                );
                self.withhold(progress, &ctx.messages.failed(), Severity::Block);
                GateOutcome::Failed
            }
            Ok(verdict) => match policy::decide(&verdict, draft) {
                Decision::Allow { correction } => self.allow(progress, correction.as_deref()),
                Decision::Withhold { level } => {
                    let message = match level {
                        VerdictLevel::Caution => ctx.messages.caution(&verdict),
                        _ => ctx.messages.blocked(&verdict),
                    };
                    self.withhold(progress, &message, level.into());
                    GateOutcome::Withheld(level)
                }
            },
        }
    }

    fn withhold(&self, progress: Option<ProgressHandle>, message: &str, severity: Severity) {
        self.transition(GateState::Blocking);
        self.report(progress, message, severity);
    }

    fn allow(&self, progress: Option<ProgressHandle>, correction: Option<&str>) -> GateOutcome {
        self.transition(GateState::Allowing);
        let ctx = &self.inner.ctx;

        let corrected = correction.is_some_and(|text| self.apply_correction(text));

        match ctx.page.dispatch_activation(self.identity()) {
            Ok(native_ran) => {
                tracing::debug!(control = %self.identity(), native_ran, "Activation re-dispatched");
                self.report(progress, &ctx.messages.allowed(corrected), Severity::Safe);
                GateOutcome::Allowed { corrected }
            }
            Err(err) => {
                tracing::warn!(
                    control = %self.identity(),
                    cause = err.code(),
                    error = %err,
                    "Re-dispatch failed"
                );
                self.report(progress, &ctx.messages.failed(), Severity::Block);
                GateOutcome::Failed
            }
        }
    }

    fn apply_correction(&self, text: &str) -> bool {
        let page = &self.inner.ctx.page;
        let selector = &self.inner.control.rule().draft_source_selector;
        let result = page
            .query_selector(selector)
            .ok_or_else(|| DomBindingError::DraftSourceMissing {
                selector: selector.clone(),
            })
            .and_then(|element| page.set_text_content(element, text));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    control = %self.identity(),
                    cause = err.code(),
                    "Correction could not be applied; submitting the original draft"
                );
                false
            }
        }
    }

    fn report(&self, progress: Option<ProgressHandle>, message: &str, severity: Severity) {
        let feedback = &self.inner.ctx.feedback;
        match progress {
            Some(handle) => feedback.resolve_progress(handle, message, severity),
            None => feedback.display(message, severity),
        }
    }
}

impl ActivationListener for Gate {
    fn on_activation(&self, event: &mut ActivationEvent) {
        if let Interception::Engaged(draft) = self.intercept(event) {
            self.spawn_cycle(draft);
        }
    }
}

/// Builds and keeps one gate per admitted control.
pub struct GateFactory {
    ctx: Arc<GateContext>,
    gates: Mutex<Vec<Gate>>,
}

impl GateFactory {
    pub fn new(ctx: Arc<GateContext>) -> Self {
        Self {
            ctx,
            gates: Mutex::new(Vec::new()),
        }
    }

    pub fn gates(&self) -> Vec<Gate> {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn gate_for(&self, control: ElementId) -> Option<Gate> {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|gate| gate.identity() == control)
            .cloned()
    }
}

impl ControlBinder for GateFactory {
    fn bind(&self, control: ControlHandle) -> Result<(), DomBindingError> {
        let gate = Gate::attach(Arc::clone(&self.ctx), control)?;
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(gate);
        Ok(())
    }
}
