use super::dom::ElementId;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Admission set of hooked controls.
///
/// An identity is admitted at most once for the page's lifetime. Entries for
/// elements that have left the document are kept; they can never fire again.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    hooked: Mutex<HashSet<ElementId>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per identity. Check and mark happen under
    /// one lock acquisition.
    pub fn admit(&self, identity: ElementId) -> bool {
        let admitted = self
            .hooked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity);
        if admitted {
            tracing::debug!(control = %identity, "Control admitted");
        }
        admitted
    }

    pub fn is_hooked(&self, identity: ElementId) -> bool {
        self.hooked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&identity)
    }

    pub fn len(&self) -> usize {
        self.hooked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn admits_each_identity_once() {
        let registry = ControlRegistry::new();
        assert!(registry.admit(ElementId(1)));
        assert!(!registry.admit(ElementId(1)));
        assert!(!registry.admit(ElementId(1)));
        assert!(registry.admit(ElementId(2)));
        assert_eq!(registry.len(), 2);
        assert!(registry.is_hooked(ElementId(1)));
        assert!(!registry.is_hooked(ElementId(3)));
    }

    #[test]
    fn concurrent_duplicate_notifications_admit_once() {
        let registry = Arc::new(ControlRegistry::new());
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if registry.admit(ElementId(42)) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }
}
