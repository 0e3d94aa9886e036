//! Thread-safe in-memory document implementing [`HostPage`].
//!
//! Backed by a `scraper::Html` tree, so selectors are matched with
//! `scraper::Selector` exactly as rule validation parses them. Used for
//! headless dry runs and tests. An activation whose default was not prevented
//! counts as the element's native action (the host site's own submit).

use super::dom::{
    ActivationEvent, ActivationListener, ElementId, HostPage, MutationBatch, MutationObserver,
};
use crate::error::DomBindingError;
use ego_tree::{NodeId, NodeRef};
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector, StrTendril};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Hooks {
    listeners: Vec<Arc<dyn ActivationListener>>,
    native_activations: usize,
}

struct Document {
    html: Html,
    body: NodeId,
    nodes: HashMap<ElementId, NodeId>,
    elements: HashMap<NodeId, ElementId>,
    hooks: HashMap<ElementId, Hooks>,
    next_id: u64,
}

impl Document {
    fn new() -> Self {
        let html = Html::parse_document("");
        let root = html.root_element();
        let body = root
            .child_elements()
            .find(|child| child.value().name() == "body")
            .unwrap_or(root)
            .id();

        let mut document = Self {
            html,
            body,
            nodes: HashMap::new(),
            elements: HashMap::new(),
            hooks: HashMap::new(),
            next_id: 0,
        };
        document.register(body);
        document
    }

    fn register(&mut self, node: NodeId) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.elements.insert(node, id);
        id
    }

    fn node(&self, id: ElementId) -> Result<NodeId, DomBindingError> {
        self.nodes
            .get(&id)
            .copied()
            .ok_or(DomBindingError::UnknownElement(id.0))
    }

    fn element(&self, id: ElementId) -> Option<ElementRef<'_>> {
        let node = self.nodes.get(&id)?;
        self.html.tree.get(*node).and_then(ElementRef::wrap)
    }

    /// Copy `source` and its subtree under `parent`, registering every
    /// element. Returns the id of `source` if it is an element.
    fn graft(&mut self, parent: NodeId, source: NodeRef<'_, Node>) -> Option<ElementId> {
        let value = source.value();
        if !(value.is_element() || value.is_text()) {
            return None;
        }
        let node = self.html.tree.get_mut(parent)?.append(value.clone()).id();
        if value.is_text() {
            return None;
        }

        let id = self.register(node);
        for child in source.children() {
            self.graft(node, child);
        }
        Some(id)
    }

    fn is_connected(&self, id: ElementId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        *node == self.body
            || self
                .html
                .tree
                .get(*node)
                .is_some_and(|n| n.ancestors().any(|a| a.id() == self.body))
    }

    fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let Some(node) = self.nodes.get(&id).and_then(|n| self.html.tree.get(*n)) else {
            return Vec::new();
        };
        node.descendants()
            .skip(1)
            .filter_map(|n| self.elements.get(&n.id()).copied())
            .collect()
    }
}

pub struct MemoryPage {
    document: Mutex<Document>,
    observers: Mutex<Vec<Arc<dyn MutationObserver>>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self {
            document: Mutex::new(Document::new()),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Build a page whose body holds `html`.
    pub fn from_html(html: &str) -> Result<Self, DomBindingError> {
        let page = Self::new();
        page.append_html(page.body(), html)?;
        Ok(page)
    }

    fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn body(&self) -> ElementId {
        let document = self.document();
        document.elements[&document.body]
    }

    /// Parse `html` as a fragment and append it under `parent`.
    ///
    /// Returns the top-level inserted elements, which are also reported to
    /// mutation observers.
    pub fn append_html(
        &self,
        parent: ElementId,
        html: &str,
    ) -> Result<Vec<ElementId>, DomBindingError> {
        let inserted = {
            let fragment = Html::parse_fragment(html);
            let mut document = self.document();
            let parent = document.node(parent)?;
            fragment
                .root_element()
                .children()
                .filter_map(|child| document.graft(parent, child))
                .collect::<Vec<_>>()
        };
        self.notify(&inserted);
        Ok(inserted)
    }

    pub fn remove(&self, element: ElementId) -> Result<(), DomBindingError> {
        let mut document = self.document();
        let node = document.node(element)?;
        if let Some(mut node) = document.html.tree.get_mut(node) {
            node.detach();
        }
        Ok(())
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.document()
            .element(element)
            .and_then(|e| e.value().attr(name).map(str::to_string))
    }

    /// Simulate a genuine user click. Returns whether the native action ran.
    pub fn click(&self, element: ElementId) -> Result<bool, DomBindingError> {
        self.dispatch(element, ActivationEvent::trusted())
    }

    /// How many times the element's native action has run.
    pub fn native_activations(&self, element: ElementId) -> usize {
        self.document()
            .hooks
            .get(&element)
            .map_or(0, |h| h.native_activations)
    }

    fn dispatch(
        &self,
        element: ElementId,
        mut event: ActivationEvent,
    ) -> Result<bool, DomBindingError> {
        let listeners = {
            let document = self.document();
            document.node(element)?;
            if !document.is_connected(element) {
                return Err(DomBindingError::Detached(element.0));
            }
            document
                .hooks
                .get(&element)
                .map(|h| h.listeners.clone())
                .unwrap_or_default()
        };

        for listener in listeners {
            listener.on_activation(&mut event);
            if event.propagation_stopped() {
                break;
            }
        }

        if event.default_prevented() {
            return Ok(false);
        }
        self.document()
            .hooks
            .entry(element)
            .or_default()
            .native_activations += 1;
        Ok(true)
    }

    fn notify(&self, added: &[ElementId]) {
        if added.is_empty() {
            return;
        }
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let batch = MutationBatch {
            added: added.to_vec(),
        };
        for observer in observers {
            observer.on_mutations(&batch);
        }
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPage for MemoryPage {
    fn query_selector(&self, selector: &str) -> Option<ElementId> {
        self.query_selector_all(selector).into_iter().next()
    }

    fn query_selector_all(&self, selector: &str) -> Vec<ElementId> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        let document = self.document();
        let Some(body) = document.html.tree.get(document.body) else {
            return Vec::new();
        };
        body.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|element| selector.matches(element))
            .filter_map(|element| document.elements.get(&element.id()).copied())
            .collect()
    }

    fn matches(&self, element: ElementId, selector: &str) -> bool {
        let Ok(selector) = Selector::parse(selector) else {
            return false;
        };
        self.document()
            .element(element)
            .is_some_and(|e| selector.matches(&e))
    }

    fn descendants(&self, element: ElementId) -> Vec<ElementId> {
        self.document().descendants(element)
    }

    fn text_content(&self, element: ElementId) -> Option<String> {
        self.document()
            .element(element)
            .map(|e| e.text().collect::<String>())
    }

    fn set_text_content(&self, element: ElementId, text: &str) -> Result<(), DomBindingError> {
        let mut document = self.document();
        let node = document.node(element)?;
        let mut target = document
            .html
            .tree
            .get_mut(node)
            .ok_or(DomBindingError::UnknownElement(element.0))?;
        while let Some(mut child) = target.first_child() {
            child.detach();
        }
        target.append(Node::Text(Text {
            text: StrTendril::from(text.to_string()),
        }));
        Ok(())
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.document().is_connected(element)
    }

    fn listen(
        &self,
        element: ElementId,
        listener: Arc<dyn ActivationListener>,
    ) -> Result<(), DomBindingError> {
        let mut document = self.document();
        document.node(element)?;
        document
            .hooks
            .entry(element)
            .or_default()
            .listeners
            .push(listener);
        Ok(())
    }

    fn dispatch_activation(&self, element: ElementId) -> Result<bool, DomBindingError> {
        self.dispatch(element, ActivationEvent::synthetic())
    }

    fn observe(&self, observer: Arc<dyn MutationObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }
}
