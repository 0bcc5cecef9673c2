use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::listeners::{Listener, ListenerId, ListenerRegistry};

/// Key value reported by key-down events for the Escape key.
pub const ESCAPE_KEY: &str = "Escape";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    PointerDown,
    KeyDown,
}

/// Document-level input events.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    PointerDown { target: NodeId },
    KeyDown { key: String },
}

impl DomEvent {
    pub fn pointer_down(target: NodeId) -> Self {
        DomEvent::PointerDown { target }
    }

    pub fn key_down(key: impl Into<String>) -> Self {
        DomEvent::KeyDown { key: key.into() }
    }

    pub fn kind(&self) -> DomEventKind {
        match self {
            DomEvent::PointerDown { .. } => DomEventKind::PointerDown,
            DomEvent::KeyDown { .. } => DomEventKind::KeyDown,
        }
    }
}

struct NodeTree {
    next_id: u64,
    // node -> parent; the body is the only node without a parent
    parents: HashMap<NodeId, Option<NodeId>>,
}

impl NodeTree {
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parents.get(&id).copied().flatten();
        }
        false
    }
}

struct DocumentInner {
    body: NodeId,
    nodes: Mutex<NodeTree>,
    listeners: ListenerRegistry<DomEventKind, DomEvent>,
}

/// Headless document: an element tree used for containment checks and the
/// global pointer/keyboard event stream.
///
/// Cloning is cheap; clones share the same tree and listeners.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut parents = HashMap::new();
        parents.insert(body, None);

        Self {
            inner: Arc::new(DocumentInner {
                body,
                nodes: Mutex::new(NodeTree {
                    next_id: 1,
                    parents,
                }),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    pub fn body(&self) -> NodeId {
        self.inner.body
    }

    pub fn create_node(&self, parent: NodeId) -> NodeId {
        let mut nodes = self.inner.nodes.lock();
        if !nodes.parents.contains_key(&parent) {
            log::warn!("Creating node under detached parent {:?}", parent);
        }
        let id = NodeId(nodes.next_id);
        nodes.next_id += 1;
        nodes.parents.insert(id, Some(parent));
        id
    }

    /// Detach `node` and its whole subtree. Returns the number of nodes removed.
    pub fn remove_node(&self, node: NodeId) -> usize {
        if node == self.inner.body {
            log::warn!("Refusing to remove the document body");
            return 0;
        }

        let mut nodes = self.inner.nodes.lock();
        let doomed: Vec<NodeId> = nodes
            .parents
            .keys()
            .copied()
            .filter(|id| nodes.is_within(*id, node))
            .collect();

        for id in &doomed {
            nodes.parents.remove(id);
        }
        doomed.len()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.inner.nodes.lock().parents.contains_key(&node)
    }

    /// Same semantics as the DOM: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.inner.nodes.lock();
        nodes.parents.contains_key(&ancestor)
            && nodes.parents.contains_key(&node)
            && nodes.is_within(node, ancestor)
    }

    pub fn add_listener(&self, kind: DomEventKind, listener: Listener<DomEvent>) -> ListenerId {
        self.inner.listeners.add(kind, listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Deliver an event to the document-level listeners.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        self.inner.listeners.dispatch(event.kind(), event)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.nodes.lock().parents.len())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn containment_follows_ancestry() {
        let document = Document::new();
        let container = document.create_node(document.body());
        let child = document.create_node(container);
        let sibling = document.create_node(document.body());

        assert!(document.contains(container, child));
        assert!(document.contains(child, child));
        assert!(document.contains(document.body(), child));
        assert!(!document.contains(child, container));
        assert!(!document.contains(container, sibling));
    }

    #[test]
    fn removing_a_node_removes_its_subtree() {
        let document = Document::new();
        let container = document.create_node(document.body());
        let child = document.create_node(container);
        let grandchild = document.create_node(child);
        let sibling = document.create_node(document.body());

        assert_eq!(document.remove_node(container), 3);
        assert!(!document.is_attached(container));
        assert!(!document.is_attached(grandchild));
        assert!(document.is_attached(sibling));
        assert!(!document.contains(container, grandchild));
    }

    #[test]
    fn body_cannot_be_removed() {
        let document = Document::new();
        assert_eq!(document.remove_node(document.body()), 0);
        assert!(document.is_attached(document.body()));
    }

    #[test]
    fn dispatch_routes_by_event_kind() {
        let document = Document::new();
        let keys = Arc::new(AtomicUsize::new(0));
        let keys_clone = Arc::clone(&keys);
        let id = document.add_listener(
            DomEventKind::KeyDown,
            Arc::new(move |_: &DomEvent| {
                keys_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        document.dispatch(&DomEvent::pointer_down(document.body()));
        document.dispatch(&DomEvent::key_down(ESCAPE_KEY));
        assert_eq!(keys.load(Ordering::SeqCst), 1);

        assert!(document.remove_listener(id));
        document.dispatch(&DomEvent::key_down(ESCAPE_KEY));
        assert_eq!(keys.load(Ordering::SeqCst), 1);
        assert_eq!(document.listener_count(), 0);
    }
}
