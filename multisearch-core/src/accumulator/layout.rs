//! Where the grouped and mixed layouts differ: admission into a full
//! section, overflow eviction, and presentation order.

use std::sync::Arc;

use super::section::ResultSection;
use crate::config::ResultLayout;
use crate::types::{outranks, FoundItem, ItemId};

impl ResultLayout {
    /// Whether `candidate` may enter `section` now.
    pub(crate) fn has_room<T>(self, section: &ResultSection<T>, candidate: &FoundItem<T>) -> bool {
        if !section.is_full() {
            return true;
        }
        match self {
            Self::Grouped => false,
            Self::Mixed => section
                .weakest(None)
                .is_some_and(|weakest| outranks(candidate, weakest)),
        }
    }

    /// Items to evict so `section` fits its limit again after inserting
    /// `inserted`. Only the mixed layout ever overflows.
    pub(crate) fn overflow<T>(
        self,
        section: &mut ResultSection<T>,
        inserted: ItemId,
    ) -> Vec<Arc<FoundItem<T>>> {
        let mut evicted = Vec::new();
        if self == Self::Grouped {
            return evicted;
        }
        while section.len() > section.limit() {
            let Some(victim) = section.weakest(Some(inserted)).map(|item| item.id()) else {
                break;
            };
            if let Some(item) = section.remove(victim) {
                evicted.push(item);
            }
        }
        evicted
    }

    /// Accepted items in presentation order.
    ///
    /// Grouped: sections by sort weight descending, insertion order within a
    /// section. Mixed: every item by priority descending, the higher sort
    /// weight first on a tie.
    pub(crate) fn present<T>(self, sections: &[ResultSection<T>]) -> Vec<Arc<FoundItem<T>>> {
        match self {
            Self::Grouped => {
                let mut ordered: Vec<&ResultSection<T>> = sections.iter().collect();
                ordered.sort_by(|a, b| b.contributor.sort_weight.cmp(&a.contributor.sort_weight));
                ordered
                    .into_iter()
                    .flat_map(|section| section.items().iter().cloned())
                    .collect()
            }
            Self::Mixed => {
                let mut items: Vec<Arc<FoundItem<T>>> = sections
                    .iter()
                    .flat_map(|section| section.items().iter().cloned())
                    .collect();
                items.sort_by(|a, b| {
                    b.priority
                        .cmp(&a.priority)
                        .then_with(|| b.contributor.sort_weight.cmp(&a.contributor.sort_weight))
                });
                items
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContributorInfo;

    fn item(priority: i32, contributor: &str, weight: i32) -> Arc<FoundItem<i32>> {
        Arc::new(FoundItem::new(
            priority,
            priority,
            ContributorInfo::new(contributor, weight),
        ))
    }

    fn full_section() -> ResultSection<i32> {
        let mut section = ResultSection::new(ContributorInfo::new("a", 0), 2);
        section.push(item(2, "a", 0));
        section.push(item(4, "a", 0));
        section
    }

    #[test]
    fn grouped_rejects_once_full() {
        let section = full_section();
        assert!(!ResultLayout::Grouped.has_room(&section, &item(9, "a", 0)));
    }

    #[test]
    fn mixed_admits_only_stronger_candidate() {
        let section = full_section();
        assert!(ResultLayout::Mixed.has_room(&section, &item(3, "a", 0)));
        assert!(!ResultLayout::Mixed.has_room(&section, &item(2, "a", 0)));
        assert!(!ResultLayout::Mixed.has_room(&section, &item(1, "a", 0)));
    }

    #[test]
    fn mixed_overflow_evicts_weakest_but_never_the_newcomer() {
        let mut section = full_section();
        let newcomer = item(3, "a", 0);
        section.push(Arc::clone(&newcomer));

        let evicted = ResultLayout::Mixed.overflow(&mut section, newcomer.id());
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].priority, 2);
        assert_eq!(section.len(), 2);
        assert!(section.items().iter().any(|i| i.id() == newcomer.id()));
    }

    #[test]
    fn grouped_never_evicts() {
        let mut section = full_section();
        let extra = item(3, "a", 0);
        section.push(Arc::clone(&extra));
        assert!(ResultLayout::Grouped.overflow(&mut section, extra.id()).is_empty());
    }

    #[test]
    fn grouped_presents_sections_by_weight() {
        let mut light = ResultSection::new(ContributorInfo::new("light", 1), 5);
        light.push(item(9, "light", 1));
        let mut heavy = ResultSection::new(ContributorInfo::new("heavy", 8), 5);
        heavy.push(item(1, "heavy", 8));
        heavy.push(item(3, "heavy", 8));

        let order: Vec<i32> = ResultLayout::Grouped
            .present(&[light, heavy])
            .iter()
            .map(|i| i.priority)
            .collect();
        assert_eq!(order, vec![1, 3, 9]);
    }

    #[test]
    fn mixed_presents_best_first_with_weight_tie_break() {
        let mut light = ResultSection::new(ContributorInfo::new("light", 1), 5);
        light.push(item(5, "light", 1));
        light.push(item(2, "light", 1));
        let mut heavy = ResultSection::new(ContributorInfo::new("heavy", 8), 5);
        heavy.push(item(5, "heavy", 8));

        let order: Vec<(i32, String)> = ResultLayout::Mixed
            .present(&[light, heavy])
            .iter()
            .map(|i| (i.priority, i.contributor_id().to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (5, "heavy".to_string()),
                (5, "light".to_string()),
                (2, "light".to_string()),
            ]
        );
    }
}
