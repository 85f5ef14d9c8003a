//! Coalescing buffer shared by the listener decorators.

use std::sync::Arc;

use super::{SearchEvent, SearchListener};
use crate::types::FoundItem;

/// Pending events not yet forwarded to the delegate.
///
/// An item added and removed within one window cancels out. Contributor
/// events keep their relative order.
pub(super) struct EventBuffer<T> {
    added: Vec<Arc<FoundItem<T>>>,
    removed: Vec<Arc<FoundItem<T>>>,
    events: Vec<SearchEvent<T>>,
}

impl<T> Default for EventBuffer<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl<T> EventBuffer<T> {
    pub(super) fn add(&mut self, items: &[Arc<FoundItem<T>>]) {
        self.added.extend(items.iter().cloned());
    }

    pub(super) fn remove(&mut self, items: &[Arc<FoundItem<T>>]) {
        for item in items {
            match self.added.iter().position(|added| added.id() == item.id()) {
                Some(position) => {
                    self.added.remove(position);
                }
                None => self.removed.push(Arc::clone(item)),
            }
        }
    }

    pub(super) fn push_event(&mut self, event: SearchEvent<T>) {
        self.events.push(event);
    }

    #[cfg(test)]
    pub(super) fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.events.is_empty()
    }

    pub(super) fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.events.clear();
    }

    /// Take everything buffered so far.
    pub(super) fn drain(&mut self) -> Flush<T> {
        Flush {
            added: std::mem::take(&mut self.added),
            removed: std::mem::take(&mut self.removed),
            events: std::mem::take(&mut self.events),
        }
    }
}

/// One consolidated batch, ready to forward.
pub(super) struct Flush<T> {
    added: Vec<Arc<FoundItem<T>>>,
    removed: Vec<Arc<FoundItem<T>>>,
    events: Vec<SearchEvent<T>>,
}

impl<T> Flush<T> {
    /// Forward adds, then removals, then contributor events.
    pub(super) fn deliver(self, delegate: &dyn SearchListener<T>) {
        if !self.added.is_empty() {
            delegate.elements_added(&self.added);
        }
        if !self.removed.is_empty() {
            delegate.elements_removed(&self.removed);
        }
        for event in &self.events {
            event.deliver(delegate);
        }
    }
}
