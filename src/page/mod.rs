//! Host page discovery: capability traits, control admission and scanning.

pub mod dom;
pub mod memory;
pub mod registry;
pub mod rules;
pub mod scanner;

pub use dom::{
    ActivationEvent, ActivationListener, ElementId, HostPage, MutationBatch, MutationObserver,
};
pub use memory::MemoryPage;
pub use registry::ControlRegistry;
pub use rules::{ObservationRule, default_rules};
pub use scanner::{ControlBinder, ControlHandle, HookState, PageScanner};
