use super::dom::{ElementId, HostPage, MutationBatch, MutationObserver};
use super::registry::ControlRegistry;
use super::rules::ObservationRule;
use crate::error::DomBindingError;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Unhooked,
    Hooked,
}

/// One discovered control instance and the rule it matched.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    identity: ElementId,
    rule: Arc<ObservationRule>,
    hook_state: HookState,
}

impl ControlHandle {
    pub fn new(identity: ElementId, rule: Arc<ObservationRule>) -> Self {
        Self {
            identity,
            rule,
            hook_state: HookState::Unhooked,
        }
    }

    pub fn identity(&self) -> ElementId {
        self.identity
    }

    pub fn rule(&self) -> &ObservationRule {
        &self.rule
    }

    pub fn hook_state(&self) -> HookState {
        self.hook_state
    }

    fn mark_hooked(&mut self) {
        self.hook_state = HookState::Hooked;
    }
}

/// Receives every control the scanner admits, exactly once per control.
///
/// Admission happens before binding and is never undone. A control whose
/// bind fails stays admitted without a listener: it is unguarded for the
/// rest of the page's lifetime and is not offered again.
pub trait ControlBinder: Send + Sync {
    fn bind(&self, control: ControlHandle) -> Result<(), DomBindingError>;
}

/// Finds submission controls as the host page inserts them.
pub struct PageScanner {
    page: Arc<dyn HostPage>,
    rules: Vec<Arc<ObservationRule>>,
    registry: Arc<ControlRegistry>,
    binder: Arc<dyn ControlBinder>,
}

impl PageScanner {
    pub fn new(
        page: Arc<dyn HostPage>,
        rules: impl IntoIterator<Item = ObservationRule>,
        registry: Arc<ControlRegistry>,
        binder: Arc<dyn ControlBinder>,
    ) -> Self {
        Self {
            page,
            rules: rules.into_iter().map(Arc::new).collect(),
            registry,
            binder,
        }
    }

    pub fn registry(&self) -> &Arc<ControlRegistry> {
        &self.registry
    }

    /// Subscribe to mutations, then sweep what is already present.
    ///
    /// Returns the number of controls admitted by the initial sweep.
    pub fn start(self: &Arc<Self>) -> usize {
        self.page.observe(Arc::new(ScannerObserver {
            scanner: Arc::downgrade(self),
        }));
        self.sweep()
    }

    /// Test the whole document against every rule.
    pub fn sweep(&self) -> usize {
        let mut candidates = Vec::new();
        for rule in &self.rules {
            candidates.extend(self.page.query_selector_all(&rule.control_selector));
        }
        let admitted = candidates
            .into_iter()
            .filter(|element| self.consider(*element))
            .count();
        tracing::debug!(admitted, rules = self.rules.len(), "Initial sweep finished");
        admitted
    }

    /// Test inserted elements and their subtrees.
    pub fn scan_batch(&self, batch: &MutationBatch) -> usize {
        let mut admitted = 0;
        for root in &batch.added {
            if !self.page.is_connected(*root) {
                continue;
            }
            if self.consider(*root) {
                admitted += 1;
            }
            for element in self.page.descendants(*root) {
                if self.consider(element) {
                    admitted += 1;
                }
            }
        }
        admitted
    }

    /// First rule, in declaration order, whose control selector matches.
    pub fn rule_for(&self, element: ElementId) -> Option<&Arc<ObservationRule>> {
        self.rules
            .iter()
            .find(|rule| self.page.matches(element, &rule.control_selector))
    }

    fn consider(&self, element: ElementId) -> bool {
        let Some(rule) = self.rule_for(element) else {
            return false;
        };
        if !self.registry.admit(element) {
            return false;
        }

        let mut control = ControlHandle::new(element, Arc::clone(rule));
        control.mark_hooked();
        tracing::info!(
            control = %element,
            platform = %rule.platform,
            selector = %rule.control_selector,
            "Submission control discovered"
        );

        if let Err(err) = self.binder.bind(control) {
            tracing::error!(
                control = %element,
                cause = err.code(),
                error = %err,
                "Failed to attach gate; control stays unguarded for this page"
            );
        }
        true
    }
}

struct ScannerObserver {
    scanner: Weak<PageScanner>,
}

impl MutationObserver for ScannerObserver {
    fn on_mutations(&self, batch: &MutationBatch) {
        if let Some(scanner) = self.scanner.upgrade() {
            scanner.scan_batch(batch);
        }
    }
}
