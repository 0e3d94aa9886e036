use crate::error::DomBindingError;
use std::fmt;
use std::sync::Arc;

/// Opaque identity of one element, stable for the element's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One activation (click) travelling through an element's listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEvent {
    trusted: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ActivationEvent {
    /// Raised by genuine user input.
    pub fn trusted() -> Self {
        Self {
            trusted: true,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Raised programmatically, e.g. by a gate re-dispatching a click.
    pub fn synthetic() -> Self {
        Self {
            trusted: false,
            ..Self::trusted()
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Capture-phase activation listener attached to one element.
pub trait ActivationListener: Send + Sync {
    fn on_activation(&self, event: &mut ActivationEvent);
}

/// Elements inserted into the document by one mutation notification.
///
/// Hosts may report the same element in several batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<ElementId>,
}

pub trait MutationObserver: Send + Sync {
    fn on_mutations(&self, batch: &MutationBatch);
}

/// What the guard needs from the page it is embedded in.
pub trait HostPage: Send + Sync {
    fn query_selector(&self, selector: &str) -> Option<ElementId>;

    /// All matching elements in document order.
    fn query_selector_all(&self, selector: &str) -> Vec<ElementId>;

    fn matches(&self, element: ElementId, selector: &str) -> bool;

    /// Every element below `element`, depth first, excluding `element` itself.
    fn descendants(&self, element: ElementId) -> Vec<ElementId>;

    fn text_content(&self, element: ElementId) -> Option<String>;

    fn set_text_content(&self, element: ElementId, text: &str) -> Result<(), DomBindingError>;

    fn is_connected(&self, element: ElementId) -> bool;

    fn listen(
        &self,
        element: ElementId,
        listener: Arc<dyn ActivationListener>,
    ) -> Result<(), DomBindingError>;

    /// Re-dispatch a non-trusted activation on `element`.
    ///
    /// Returns whether the element's native action ran.
    fn dispatch_activation(&self, element: ElementId) -> Result<bool, DomBindingError>;

    fn observe(&self, observer: Arc<dyn MutationObserver>);
}
