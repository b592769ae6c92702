//! Memo of the last string written to each (element, slot)

use crate::dom::{Element, WeakElement};
use crate::markers::Slot;
use std::collections::HashMap;

#[derive(Debug)]
struct Entry {
    element: WeakElement,
    values: HashMap<Slot, String>,
}

impl Entry {
    fn is_for(&self, element: &Element) -> bool {
        self.element.upgrade().as_ref() == Some(element)
    }
}

/// Per-node render memo that never keeps nodes alive
///
/// Entries hold weak handles. An address reused by a new node is detected on
/// lookup and treated as a miss.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<usize, Entry>,
}

impl RenderCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written to `slot` of `element`
    pub fn get(&self, element: &Element, slot: Slot) -> Option<&str> {
        self.entries
            .get(&element.id())
            .filter(|entry| entry.is_for(element))
            .and_then(|entry| entry.values.get(&slot))
            .map(String::as_str)
    }

    /// Remember that `value` is now in `slot` of `element`
    pub fn record(&mut self, element: &Element, slot: Slot, value: &str) {
        let entry = self.entries.entry(element.id()).or_insert_with(|| Entry {
            element: element.downgrade(),
            values: HashMap::new(),
        });
        if !entry.is_for(element) {
            *entry = Entry {
                element: element.downgrade(),
                values: HashMap::new(),
            };
        }
        entry.values.insert(slot, value.to_string());
    }

    /// Forget `root` and all its descendants
    pub fn clear_subtree(&mut self, root: &Element) -> usize {
        root.subtree()
            .iter()
            .filter(|element| self.entries.remove(&element.id()).is_some())
            .count()
    }

    /// Drop entries whose element no longer exists
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.element.upgrade().is_some());
        before - self.entries.len()
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked elements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
