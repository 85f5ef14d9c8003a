//! Cross-contributor deduplication rules.
//!
//! An [`EqualityProvider`] looks at a candidate and everything already
//! accepted in the session and decides whether the candidate duplicates an
//! existing item, and if so which one survives. Providers are composed into
//! a priority chain with [`compose`]: the first provider that returns
//! something other than [`EqualityAction::DoNothing`] decides.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::types::{outranks, FoundItem};

/// Decision for a candidate item.
#[derive(Debug)]
pub enum EqualityAction<T> {
    /// The candidate is not a duplicate of anything.
    DoNothing,
    /// The candidate duplicates a stronger item and is discarded.
    Skip,
    /// The candidate is accepted and these items are removed.
    Replace(Vec<Arc<FoundItem<T>>>),
}

impl<T> EqualityAction<T> {
    pub fn is_do_nothing(&self) -> bool {
        matches!(self, Self::DoNothing)
    }
}

/// A pluggable rule deciding whether two found items are the same.
///
/// Implementations must decide the `Replace` direction explicitly by
/// comparing the items (see [`outranks`]), never by argument position.
pub trait EqualityProvider<T>: Send + Sync {
    fn compare_items(
        &self,
        candidate: &Arc<FoundItem<T>>,
        already_found: &[&Arc<FoundItem<T>>],
    ) -> EqualityAction<T>;
}

/// Ordered chain of providers; first non-`DoNothing` answer wins.
pub struct CompositeEqualityProvider<T> {
    providers: Vec<Arc<dyn EqualityProvider<T>>>,
}

impl<T> CompositeEqualityProvider<T> {
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<T> EqualityProvider<T> for CompositeEqualityProvider<T> {
    fn compare_items(
        &self,
        candidate: &Arc<FoundItem<T>>,
        already_found: &[&Arc<FoundItem<T>>],
    ) -> EqualityAction<T> {
        for provider in &self.providers {
            let action = provider.compare_items(candidate, already_found);
            if !action.is_do_nothing() {
                return action;
            }
        }
        EqualityAction::DoNothing
    }
}

/// Compose providers into a single priority chain.
///
/// An empty chain never deduplicates.
pub fn compose<T>(providers: Vec<Arc<dyn EqualityProvider<T>>>) -> CompositeEqualityProvider<T> {
    CompositeEqualityProvider { providers }
}

/// Treats items as equal when an extracted key matches.
///
/// Elements without a key never match. When the candidate outranks every
/// item sharing its key, those items are replaced; otherwise the candidate
/// is skipped.
pub struct KeyEqualityProvider<T, K, F> {
    key: F,
    _marker: PhantomData<fn(&T) -> K>,
}

impl<T, K, F> KeyEqualityProvider<T, K, F>
where
    F: Fn(&T) -> Option<K> + Send + Sync,
    K: PartialEq,
{
    pub fn new(key: F) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }
}

impl<T, K, F> EqualityProvider<T> for KeyEqualityProvider<T, K, F>
where
    F: Fn(&T) -> Option<K> + Send + Sync,
    K: PartialEq,
{
    fn compare_items(
        &self,
        candidate: &Arc<FoundItem<T>>,
        already_found: &[&Arc<FoundItem<T>>],
    ) -> EqualityAction<T> {
        let Some(candidate_key) = (self.key)(&candidate.element) else {
            return EqualityAction::DoNothing;
        };

        let mut duplicates = Vec::new();
        for existing in already_found {
            if existing.id() == candidate.id() {
                continue;
            }
            if (self.key)(&existing.element).as_ref() != Some(&candidate_key) {
                continue;
            }
            if !outranks(candidate, existing) {
                return EqualityAction::Skip;
            }
            duplicates.push(Arc::clone(existing));
        }

        if duplicates.is_empty() {
            EqualityAction::DoNothing
        } else {
            EqualityAction::Replace(duplicates)
        }
    }
}
