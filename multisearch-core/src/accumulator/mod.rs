//! Shared, lock-protected result store for one search session.
//!
//! Every worker pushes into the same [`ResultsAccumulator`]. One mutex guards
//! all sections and the `finished` flag, and each section has its own
//! condition variable that producers blocked on a full section wait on.
//! Capacity check, equality resolution and insertion run as one critical
//! section; listener events are queued under the lock and delivered outside
//! it by the session's notifier.

mod layout;
mod section;

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ResultLayout;
use crate::equality::{EqualityAction, EqualityProvider};
use crate::listener::HasMoreMap;
use crate::notify::Notifier;
use crate::types::{ContributorId, ContributorInfo, Correction, FoundItem};

use section::ResultSection;

/// What happened to an element offered to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Inserted into its section.
    Added,
    /// Dropped as a duplicate of a stronger item. Does not consume a slot.
    Skipped,
    /// Not accepted: the session finished or was cancelled while the
    /// section was full.
    Rejected,
}

impl AddOutcome {
    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

struct SessionState<T> {
    sections: Vec<ResultSection<T>>,
    finished: bool,
}

impl<T> SessionState<T> {
    fn all_settled(&self) -> bool {
        self.sections.iter().all(ResultSection::is_settled)
    }
}

pub(crate) struct ResultsAccumulator<T> {
    layout: ResultLayout,
    state: Mutex<SessionState<T>>,
    conditions: Vec<Condvar>,
    index: HashMap<ContributorId, usize>,
    equality: Arc<dyn EqualityProvider<T>>,
    notifier: Notifier<T>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl<T: Send + Sync + 'static> ResultsAccumulator<T> {
    /// Build the session store.
    ///
    /// `limits` lists the searched contributors and how many items each may
    /// hold. `seed` carries items accepted by an earlier session: seeds of a
    /// searched contributor go into its section on top of its limit, the rest
    /// into settled reference sections that only take part in deduplication.
    pub(crate) fn new(
        layout: ResultLayout,
        limits: &[(ContributorInfo, usize)],
        seed: Vec<Arc<FoundItem<T>>>,
        equality: Arc<dyn EqualityProvider<T>>,
        notifier: Notifier<T>,
        cancel: CancellationToken,
        poll_interval: Duration,
    ) -> Self {
        let mut sections = Vec::with_capacity(limits.len());
        let mut index = HashMap::with_capacity(limits.len());
        for (info, limit) in limits {
            index.insert(info.id.clone(), sections.len());
            sections.push(ResultSection::new(info.clone(), *limit));
        }

        for item in seed {
            let position = match index.get(item.contributor_id()) {
                Some(&position) => position,
                None => {
                    let position = sections.len();
                    index.insert(item.contributor_id().clone(), position);
                    sections.push(ResultSection::reference(item.contributor.clone()));
                    position
                }
            };
            sections[position].seed(item);
        }

        let conditions = sections.iter().map(|_| Condvar::new()).collect();
        Self {
            layout,
            state: Mutex::new(SessionState {
                sections,
                finished: false,
            }),
            conditions,
            index,
            equality,
            notifier,
            cancel,
            poll_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offer one element produced by `contributor`.
    ///
    /// Blocks while the contributor's section has no room, re-checking
    /// cancellation every poll interval.
    pub(crate) fn add_element(
        &self,
        contributor: &ContributorId,
        element: T,
        priority: i32,
        correction: Option<Correction>,
    ) -> AddOutcome {
        let Some(&position) = self.index.get(contributor) else {
            tracing::warn!(%contributor, "element from unknown contributor");
            return AddOutcome::Rejected;
        };

        let mut guard = self.lock();
        let info = guard.sections[position].contributor.clone();
        let mut candidate = FoundItem::new(element, priority, info);
        if let Some(correction) = correction {
            candidate = candidate.with_correction(correction);
        }
        let candidate = Arc::new(candidate);

        let mut announced = false;
        loop {
            if guard.finished || self.cancel.is_cancelled() {
                return AddOutcome::Rejected;
            }
            if self.layout.has_room(&guard.sections[position], &candidate) {
                break;
            }
            if !announced {
                announced = true;
                self.notifier
                    .contributor_waits(guard.sections[position].contributor.clone());
                tracing::debug!(%contributor, "section full, producer waiting");
            }
            guard = self.conditions[position]
                .wait_timeout(guard, self.poll_interval)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }

        let action = {
            let already_found: Vec<&Arc<FoundItem<T>>> = guard
                .sections
                .iter()
                .flat_map(|section| section.items().iter())
                .collect();
            self.equality.compare_items(&candidate, &already_found)
        };

        let mut removed = Vec::new();
        match action {
            EqualityAction::Skip => return AddOutcome::Skipped,
            EqualityAction::Replace(victims) => {
                for victim in victims {
                    let Some(&owner) = self.index.get(victim.contributor_id()) else {
                        continue;
                    };
                    if let Some(item) = guard.sections[owner].remove(victim.id()) {
                        removed.push(item);
                        self.conditions[owner].notify_all();
                    }
                }
            }
            EqualityAction::DoNothing => {}
        }

        let section = &mut guard.sections[position];
        section.push(Arc::clone(&candidate));
        removed.extend(self.layout.overflow(section, candidate.id()));
        let reached_limit = section.is_full();

        self.notifier.elements_removed(removed);
        self.notifier.elements_added(vec![candidate]);

        if reached_limit && guard.all_settled() {
            self.finish_locked(&mut guard);
        }
        AddOutcome::Added
    }

    /// The contributor's production ended normally.
    pub(crate) fn source_finished(&self, contributor: &ContributorId) {
        let Some(&position) = self.index.get(contributor) else {
            return;
        };
        let mut guard = self.lock();
        let section = &mut guard.sections[position];
        section.finish();
        self.notifier
            .contributor_finished(section.contributor.clone(), section.has_more());
        if !guard.finished && guard.all_settled() {
            self.finish_locked(&mut guard);
        }
    }

    /// Record that the contributor had results it could not deliver.
    pub(crate) fn set_source_has_more(&self, contributor: &ContributorId, has_more: bool) {
        if let Some(&position) = self.index.get(contributor) {
            self.lock().sections[position].set_has_more(has_more);
        }
    }

    /// Finish the session and release every blocked producer.
    pub(crate) fn stop(&self) {
        let mut guard = self.lock();
        if !guard.finished {
            self.finish_locked(&mut guard);
        }
    }

    fn finish_locked(&self, state: &mut SessionState<T>) {
        state.finished = true;
        for condition in &self.conditions {
            condition.notify_all();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Truncation flags of the searched contributors.
    pub(crate) fn has_more_map(&self) -> HasMoreMap {
        self.lock()
            .sections
            .iter()
            .filter(|section| !section.is_reference())
            .map(|section| (section.contributor.id.clone(), section.has_more()))
            .collect()
    }

    /// Accepted items in presentation order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<FoundItem<T>>> {
        self.layout.present(&self.lock().sections)
    }

    pub(crate) fn notifier(&self) -> &Notifier<T> {
        &self.notifier
    }
}
