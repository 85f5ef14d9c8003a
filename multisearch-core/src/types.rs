//! Core value types: contributor identity, found items and their ordering.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Stable identity of a contributor. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContributorId(Arc<str>);

impl ContributorId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContributorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Serialize for ContributorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Snapshot of the contributor attributes the engine needs after the
/// contributor itself is out of reach (ordering, event payloads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorInfo {
    /// Stable identity.
    pub id: ContributorId,
    /// Tie-break weight; the higher weight wins an equal-priority tie.
    pub sort_weight: i32,
    /// Slow contributors are not waited for before the first paint.
    pub slow: bool,
}

impl ContributorInfo {
    pub fn new(id: &str, sort_weight: i32) -> Self {
        Self {
            id: ContributorId::new(id),
            sort_weight,
            slow: false,
        }
    }

    pub fn slow(mut self, slow: bool) -> Self {
        self.slow = slow;
        self
    }
}

/// Spell-correction metadata attached to an item found for a corrected pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    /// The pattern the contributor actually matched.
    pub corrected_pattern: String,
    /// Confidence in the correction, 0.0 to 1.0.
    pub confidence: f64,
}

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a found item. Replacement victims are removed
/// by this identity, never by element equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// An element produced by a contributor, with its priority. Immutable once
/// constructed; shared as `Arc<FoundItem<T>>`.
#[derive(Debug)]
pub struct FoundItem<T> {
    id: ItemId,
    /// The contributor's opaque value.
    pub element: T,
    /// Caller-supplied relevance; higher is better.
    pub priority: i32,
    /// Where the item came from.
    pub contributor: ContributorInfo,
    /// Present when the item matched a corrected pattern.
    pub correction: Option<Correction>,
}

impl<T> FoundItem<T> {
    pub fn new(element: T, priority: i32, contributor: ContributorInfo) -> Self {
        Self {
            id: ItemId::next(),
            element,
            priority,
            contributor,
            correction: None,
        }
    }

    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.correction = Some(correction);
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn contributor_id(&self) -> &ContributorId {
        &self.contributor.id
    }
}

/// Canonical item ordering: priority ascending, then contributor sort
/// weight descending.
///
/// This is a sort order, not a strength ranking: on a priority tie the
/// heavier contributor sorts first even though it is the stronger item.
/// Use [`outranks`] to decide which of two items survives.
pub fn compare_found<T>(a: &FoundItem<T>, b: &FoundItem<T>) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.contributor.sort_weight.cmp(&a.contributor.sort_weight))
}

/// Whether `a` should survive over `b` when only one of them can stay.
///
/// Higher priority wins; on equal priority the higher-weight contributor
/// wins. A full tie never outranks, so the incumbent is kept.
pub fn outranks<T>(a: &FoundItem<T>, b: &FoundItem<T>) -> bool {
    match a.priority.cmp(&b.priority) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.contributor.sort_weight > b.contributor.sort_weight,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn item(priority: i32, weight: i32) -> FoundItem<&'static str> {
        FoundItem::new("x", priority, ContributorInfo::new("c", weight))
    }

    #[test]
    fn ids_are_unique() {
        let a = item(1, 0);
        let b = item(1, 0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn priority_orders_ascending() {
        assert_eq!(compare_found(&item(1, 0), &item(2, 0)), Ordering::Less);
        assert_eq!(compare_found(&item(5, 0), &item(2, 0)), Ordering::Greater);
    }

    #[test]
    fn equal_priority_orders_by_weight_descending() {
        let heavy = item(3, 10);
        let light = item(3, 1);
        assert_eq!(compare_found(&heavy, &light), Ordering::Less);
        assert_eq!(compare_found(&light, &heavy), Ordering::Greater);
        assert_eq!(compare_found(&heavy, &item(3, 10)), Ordering::Equal);
    }

    #[test]
    fn sorting_is_priority_ascending_then_weight_descending() {
        let mut items = [item(2, 0), item(1, 5), item(2, 9), item(1, 1)];
        items.sort_by(compare_found);
        let keys: Vec<(i32, i32)> = items
            .iter()
            .map(|i| (i.priority, i.contributor.sort_weight))
            .collect();
        assert_eq!(keys, vec![(1, 5), (1, 1), (2, 9), (2, 0)]);
    }

    #[test]
    fn heavier_item_sorts_first_but_outranks_on_tie() {
        let heavy = item(2, 9);
        let light = item(2, 0);
        assert_eq!(compare_found(&heavy, &light), Ordering::Less);
        assert!(outranks(&heavy, &light));
    }

    #[test]
    fn higher_priority_outranks() {
        assert!(outranks(&item(3, 0), &item(1, 100)));
        assert!(!outranks(&item(1, 100), &item(3, 0)));
    }

    #[test]
    fn higher_weight_wins_priority_tie() {
        assert!(outranks(&item(2, 7), &item(2, 3)));
        assert!(!outranks(&item(2, 3), &item(2, 7)));
    }

    #[test]
    fn full_tie_keeps_incumbent() {
        assert!(!outranks(&item(2, 3), &item(2, 3)));
    }

    #[test]
    fn contributor_id_serializes_as_string() {
        let json = serde_json::to_string(&ContributorId::new("files")).expect("serialize");
        assert_eq!(json, "\"files\"");
    }

    #[test]
    fn correction_is_attached() {
        let found = item(1, 0).with_correction(Correction {
            corrected_pattern: "search".into(),
            confidence: 0.8,
        });
        assert_eq!(
            found.correction.as_ref().map(|c| c.corrected_pattern.as_str()),
            Some("search")
        );
    }
}
