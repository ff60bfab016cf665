//! Reconciliation of remote metadata against the saved snapshot.
//!
//! Decision order:
//! 1. No saved snapshot: every remote entry is planned (`NoPriorState`).
//! 2. Saved entry found and remote timestamp strictly greater: `Newer`.
//!    Found and not newer: current, not planned. Equal timestamps are current.
//! 3. Remote entries never matched in step 2: `New`.
//! 4. Forced ids not already planned: `Forced`.
//!
//! Each identifier appears at most once; the first reason wins.

use wsmirror_core::{ItemId, SyncState, WorkshopEntry};

use crate::update_set::UpdateSet;

/// Why an identifier is in the update plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    NoPriorState,
    Newer { saved: i64, remote: i64 },
    New,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub id: ItemId,
    pub reason: UpdateReason,
}

/// Identifiers requiring a fresh download, in decision order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    updates: Vec<PlannedUpdate>,
    ids: UpdateSet,
}

impl UpdatePlan {
    fn push(&mut self, id: ItemId, reason: UpdateReason) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.updates.push(PlannedUpdate { id, reason });
        true
    }

    pub fn ids(&self) -> &[ItemId] {
        self.ids.as_slice()
    }

    pub fn updates(&self) -> &[PlannedUpdate] {
        &self.updates
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Compute the update plan. Pure apart from logging.
pub fn reconcile(
    remote: &[WorkshopEntry],
    saved: Option<&SyncState>,
    forced: &[ItemId],
) -> UpdatePlan {
    let mut plan = UpdatePlan::default();

    match saved {
        None => {
            for entry in remote {
                if plan.push(entry.id, UpdateReason::NoPriorState) {
                    tracing::info!("updating {entry}");
                }
            }
        }
        Some(state) => {
            let mut matched_current = vec![false; remote.len()];
            for (index, entry) in remote.iter().enumerate() {
                let Some(saved_entry) = state.get(entry.id) else {
                    continue;
                };
                if entry.timestamp > saved_entry.timestamp {
                    let reason = UpdateReason::Newer {
                        saved: saved_entry.timestamp,
                        remote: entry.timestamp,
                    };
                    if plan.push(entry.id, reason) {
                        tracing::info!("updating {entry}");
                    }
                } else {
                    matched_current[index] = true;
                }
            }

            for (index, entry) in remote.iter().enumerate() {
                if !matched_current[index] && plan.push(entry.id, UpdateReason::New) {
                    tracing::info!("updating new entry {entry}");
                }
            }
        }
    }

    for id in forced {
        if plan.push(*id, UpdateReason::Forced) {
            tracing::info!(%id, "forcing update");
        }
    }

    plan
}

/// Set each entry's `outdated` flag from the plan.
pub fn mark_outdated(entries: &mut [WorkshopEntry], plan: &UpdatePlan) {
    for entry in entries {
        entry.outdated = plan.contains(entry.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn entry(raw: u64, timestamp: i64) -> WorkshopEntry {
        WorkshopEntry::new(id(raw), format!("item {raw}"), timestamp, None)
    }

    fn state_of(entries: &[WorkshopEntry]) -> SyncState {
        let mut state = SyncState::new(0);
        for e in entries {
            state.record(e);
        }
        state
    }

    fn raw_ids(plan: &UpdatePlan) -> Vec<u64> {
        plan.ids().iter().map(|i| i.get()).collect()
    }

    #[test]
    fn no_state_means_full_resync() {
        let remote = vec![entry(1, 10), entry(2, 20), entry(3, 30)];
        let plan = reconcile(&remote, None, &[]);
        assert_eq!(raw_ids(&plan), vec![1, 2, 3]);
        assert!(plan
            .updates()
            .iter()
            .all(|u| u.reason == UpdateReason::NoPriorState));
    }

    #[rstest]
    #[case::equal(100, 100, false)]
    #[case::newer(100, 101, true)]
    #[case::older(100, 99, false)]
    fn timestamp_comparison(#[case] saved: i64, #[case] remote: i64, #[case] planned: bool) {
        let state = state_of(&[entry(5, saved)]);
        let plan = reconcile(&[entry(5, remote)], Some(&state), &[]);
        assert_eq!(plan.contains(id(5)), planned);
    }

    #[test]
    fn newer_entry_carries_both_timestamps() {
        let state = state_of(&[entry(5, 100)]);
        let plan = reconcile(&[entry(5, 150)], Some(&state), &[]);
        assert_eq!(
            plan.updates(),
            &[PlannedUpdate {
                id: id(5),
                reason: UpdateReason::Newer { saved: 100, remote: 150 },
            }]
        );
    }

    #[test]
    fn entries_absent_from_snapshot_are_new() {
        let state = state_of(&[entry(1, 10)]);
        let plan = reconcile(&[entry(1, 10), entry(2, 5)], Some(&state), &[]);
        assert_eq!(
            plan.updates(),
            &[PlannedUpdate { id: id(2), reason: UpdateReason::New }]
        );
    }

    #[test]
    fn forced_ids_are_appended_once_regardless_of_timestamps() {
        let state = state_of(&[entry(1, 10), entry(2, 10)]);
        let remote = vec![entry(1, 10), entry(2, 11)];
        let plan = reconcile(&remote, Some(&state), &[id(1), id(2), id(1), id(99)]);

        assert_eq!(raw_ids(&plan), vec![2, 1, 99]);
        assert_eq!(plan.updates()[0].reason, UpdateReason::Newer { saved: 10, remote: 11 });
        assert_eq!(plan.updates()[1].reason, UpdateReason::Forced);
    }

    #[test]
    fn second_run_against_own_snapshot_is_empty() {
        let remote = vec![entry(1, 10), entry(2, 20)];
        let first = reconcile(&remote, None, &[]);
        assert_eq!(first.len(), 2);

        let snapshot = state_of(&remote);
        let second = reconcile(&remote, Some(&snapshot), &[]);
        assert!(second.is_empty());
    }

    #[test]
    fn duplicate_remote_records_plan_once() {
        let plan = reconcile(&[entry(1, 10), entry(1, 10)], None, &[]);
        assert_eq!(raw_ids(&plan), vec![1]);
    }

    #[test]
    fn mark_outdated_clears_current_entries() {
        let state = state_of(&[entry(1, 10)]);
        let mut remote = vec![entry(1, 10), entry(2, 10)];
        let plan = reconcile(&remote, Some(&state), &[]);
        mark_outdated(&mut remote, &plan);
        assert!(!remote[0].needs_update());
        assert!(remote[1].needs_update());
    }
}
