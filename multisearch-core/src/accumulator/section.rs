//! Per-contributor, capacity-bounded bag of accepted items.

use std::sync::Arc;

use crate::types::{outranks, ContributorInfo, FoundItem, ItemId};

pub(crate) struct ResultSection<T> {
    pub(crate) contributor: ContributorInfo,
    items: Vec<Arc<FoundItem<T>>>,
    limit: usize,
    has_more: bool,
    finished: bool,
    reference: bool,
}

impl<T> ResultSection<T> {
    pub(crate) fn new(contributor: ContributorInfo, limit: usize) -> Self {
        Self {
            contributor,
            items: Vec::new(),
            limit,
            has_more: false,
            finished: false,
            reference: false,
        }
    }

    /// Holds items carried over from an earlier session for a contributor
    /// that is not searched again. Settled from the start.
    pub(crate) fn reference(contributor: ContributorInfo) -> Self {
        Self {
            contributor,
            items: Vec::new(),
            limit: 0,
            has_more: false,
            finished: true,
            reference: true,
        }
    }

    /// Carry over an item from an earlier session. Seeds never count
    /// against the section's own limit.
    pub(crate) fn seed(&mut self, item: Arc<FoundItem<T>>) {
        self.items.push(item);
        self.limit += 1;
    }

    pub(crate) fn push(&mut self, item: Arc<FoundItem<T>>) {
        self.items.push(item);
    }

    pub(crate) fn remove(&mut self, id: ItemId) -> Option<Arc<FoundItem<T>>> {
        let position = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(position))
    }

    pub(crate) fn items(&self) -> &[Arc<FoundItem<T>>] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    /// Full sections and finished contributors no longer hold up the session.
    pub(crate) fn is_settled(&self) -> bool {
        self.finished || self.is_full()
    }

    pub(crate) fn is_reference(&self) -> bool {
        self.reference
    }

    pub(crate) fn has_more(&self) -> bool {
        self.has_more
    }

    pub(crate) fn set_has_more(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }

    /// The item every other item outranks, ignoring `except`. The earliest
    /// wins a full tie.
    pub(crate) fn weakest(&self, except: Option<ItemId>) -> Option<&Arc<FoundItem<T>>> {
        self.items
            .iter()
            .filter(|item| Some(item.id()) != except)
            .reduce(|weakest, item| {
                if outranks(weakest, item) {
                    item
                } else {
                    weakest
                }
            })
    }
}
