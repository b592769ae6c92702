//! Minimal in-memory UI tree with mutation notifications
//!
//! [`Element`] is a cheap handle; clones refer to the same node. Live
//! structural changes go through [`Document`] so subscribers see every
//! insertion and removal in order.

use crate::error::{I18nError, I18nResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Elements that cannot hold text content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

struct Node {
    tag: String,
    attributes: RwLock<BTreeMap<String, String>>,
    text: RwLock<String>,
    children: RwLock<Vec<Element>>,
    parent: RwLock<Weak<Node>>,
    writes: AtomicUsize,
}

/// Handle to a node of the UI tree
#[derive(Clone)]
pub struct Element(Arc<Node>);

/// Non-owning handle to an [`Element`]
#[derive(Clone)]
pub struct WeakElement(Weak<Node>);

impl WeakElement {
    /// The element, if it is still alive
    pub fn upgrade(&self) -> Option<Element> {
        self.0.upgrade().map(Element)
    }
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakElement")
    }
}

impl Element {
    /// Create a detached element
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Arc::new(Node {
            tag: tag.into().to_lowercase(),
            attributes: RwLock::new(BTreeMap::new()),
            text: RwLock::new(String::new()),
            children: RwLock::new(Vec::new()),
            parent: RwLock::new(Weak::new()),
            writes: AtomicUsize::new(0),
        }))
    }

    /// Builder: set an attribute without counting it as a write
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.attributes.write().insert(name.into(), value.into());
        self
    }

    /// Builder: set text without counting it as a write
    pub fn with_text(self, text: impl Into<String>) -> Self {
        *self.0.text.write() = text.into();
        self
    }

    /// Builder: attach `child` before this element is part of a document
    pub fn with_child(self, child: Element) -> Self {
        self.attach(child);
        self
    }

    pub(crate) fn attach(&self, child: Element) {
        *child.0.parent.write() = Arc::downgrade(&self.0);
        self.0.children.write().push(child);
    }

    pub(crate) fn detach(&self, child: &Element) -> bool {
        let mut children = self.0.children.write();
        let Some(index) = children.iter().position(|c| c == child) else {
            return false;
        };
        let removed = children.remove(index);
        *removed.0.parent.write() = Weak::new();
        true
    }

    /// Stable identity for the lifetime of the node
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakElement {
        WeakElement(Arc::downgrade(&self.0))
    }

    /// Lower-case tag name
    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    /// Whether the element can hold text content
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag())
    }

    /// Attribute value
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.read().get(name).cloned()
    }

    /// All attribute names, sorted
    pub fn attribute_names(&self) -> Vec<String> {
        self.0.attributes.read().keys().cloned().collect()
    }

    /// Set an attribute
    pub fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .attributes
            .write()
            .insert(name.to_string(), value.to_string());
        self.0.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove an attribute, returning its value
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.write().remove(name)
    }

    /// Text content
    pub fn text(&self) -> String {
        self.0.text.read().clone()
    }

    /// Replace the text content
    pub fn set_text(&self, text: &str) -> I18nResult<()> {
        if self.is_void() {
            return Err(I18nError::UiWriteFailure {
                key: String::new(),
                slot: "text".to_string(),
                reason: format!("<{}> cannot hold text", self.tag()),
            });
        }
        *self.0.text.write() = text.to_string();
        self.0.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of text and attribute writes since creation
    pub fn write_count(&self) -> usize {
        self.0.writes.load(Ordering::Relaxed)
    }

    /// Direct children
    pub fn children(&self) -> Vec<Element> {
        self.0.children.read().clone()
    }

    /// Parent element, if attached
    pub fn parent(&self) -> Option<Element> {
        self.0.parent.read().upgrade().map(Element)
    }

    /// This element and all descendants, depth-first in document order
    pub fn subtree(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(element) = stack.pop() {
            stack.extend(element.children().into_iter().rev());
            out.push(element);
        }
        out
    }

    /// Whether `other` is this element or one of its descendants
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if &element == self {
                return true;
            }
            current = element.parent();
        }
        false
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag())
            .field("attributes", &*self.0.attributes.read())
            .field("text", &*self.0.text.read())
            .field("children", &self.0.children.read().len())
            .finish()
    }
}

/// Structural changes delivered to subscribers
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Roots of inserted subtrees
    pub added: Vec<Element>,
    /// Roots of removed subtrees
    pub removed: Vec<Element>,
}

impl MutationBatch {
    /// Whether the batch carries no changes
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A UI tree whose live mutations are observable
pub struct Document {
    root: Element,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<MutationBatch>>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl Document {
    /// Create a document around an existing root
    pub fn new(root: Element) -> Arc<Self> {
        Arc::new(Self {
            root,
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Receive every subsequent [`MutationBatch`]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MutationBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Insert `child` under `parent` and notify subscribers
    pub fn append_child(&self, parent: &Element, child: Element) {
        parent.attach(child.clone());
        self.publish(MutationBatch {
            added: vec![child],
            removed: Vec::new(),
        });
    }

    /// Remove `child` from `parent` and notify subscribers
    pub fn remove_child(&self, parent: &Element, child: &Element) -> bool {
        if !parent.detach(child) {
            return false;
        }
        self.publish(MutationBatch {
            added: Vec::new(),
            removed: vec![child.clone()],
        });
        true
    }

    fn publish(&self, batch: MutationBatch) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(batch.clone()).is_ok());
    }
}
