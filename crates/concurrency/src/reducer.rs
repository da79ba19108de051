//! FifoReducer (C6): folds a FIFO batch into a final field→value map

use crate::resolver::{resolve, ResolverOutcome};
use chrono::{DateTime, Utc};
use fcm_core::{ChangeId, Disposition, Error, FieldPath, FieldValue, Result, SessionId, StepNumber};
use fcm_storage::{ChangeStore, ConflictStore};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// The outcome of reducing one `(session, step)`'s pending queue
pub struct ReducerOutput {
    /// The final field→value map to merge into the document
    pub final_values: BTreeMap<FieldPath, FieldValue>,
    /// Change ids to mark processed (winners and losers of resolved
    /// conflicts, and every conflict-free change)
    pub to_process: Vec<ChangeId>,
    /// Per-change audit entries, in the order the reducer visited them
    pub entries: Vec<(ChangeId, Disposition, String)>,
    /// How many pending changes were read at the start of this reduction
    pub input_count: usize,
}

/// Drain `(session, step)`'s pending queue in FIFO order, resolving any
/// conflicted fields, and produce the field→value map to apply
///
/// Pure given the store's contents and the stores' resolution strategies:
/// replaying the same history through the same strategy always yields the
/// same output.
pub fn reduce(
    changes: &dyn ChangeStore,
    conflicts: &dyn ConflictStore,
    session: &SessionId,
    step: StepNumber,
    now: DateTime<Utc>,
) -> Result<ReducerOutput> {
    let pending = changes.pending_for(session, step)?;
    let input_count = pending.len();

    let mut final_values = BTreeMap::new();
    let mut to_process = Vec::new();
    let mut entries = Vec::new();
    let mut decided: FxHashMap<FieldPath, ResolverOutcome> = FxHashMap::default();

    for change in &pending {
        if !change.conflict_detected {
            final_values.insert(change.field_path.clone(), change.new_value.clone());
            to_process.push(change.change_id);
            entries.push((change.change_id, Disposition::Applied, "no conflict".to_string()));
            continue;
        }

        if !decided.contains_key(&change.field_path) {
            let outcome = if let Some(conflict) = conflicts.open_for_field(session, step, &change.field_path)? {
                let members = changes.pending_for_field(session, step, &change.field_path)?;
                let outcome = resolve(conflict.resolution_strategy, &members);
                if let ResolverOutcome::Decided { final_value, .. } = &outcome {
                    conflicts.close(conflict.conflict_id, now, "fifo-reducer", final_value.clone())?;
                    final_values.insert(change.field_path.clone(), final_value.clone());
                }
                outcome
            } else {
                // Already closed by an explicit manual resolution; this
                // flush is the one that actually applies and marks it
                // processed, per the reduce -> apply -> mark_processed
                // contract.
                let closed = conflicts
                    .for_field(session, step, &change.field_path)?
                    .filter(|c| !c.is_open())
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "change {} flagged conflicted but no conflict record exists for {}",
                            change.change_id, change.field_path
                        ))
                    })?;
                let final_value = closed
                    .final_value
                    .clone()
                    .ok_or_else(|| Error::Internal(format!("closed conflict {} has no final value", closed.conflict_id)))?;
                final_values.insert(change.field_path.clone(), final_value.clone());
                let applied: BTreeSet<ChangeId> = changes
                    .pending_for_field(session, step, &change.field_path)?
                    .iter()
                    .filter(|c| c.new_value == final_value)
                    .map(|c| c.change_id)
                    .collect();
                ResolverOutcome::Decided { final_value, applied }
            };
            decided.insert(change.field_path.clone(), outcome);
        }

        match decided.get(&change.field_path).unwrap() {
            ResolverOutcome::Decided { applied, .. } => {
                to_process.push(change.change_id);
                if applied.contains(&change.change_id) {
                    entries.push((change.change_id, Disposition::Applied, "conflict resolved in its favor".to_string()));
                } else {
                    entries.push((
                        change.change_id,
                        Disposition::ShadowedByConflictLoss,
                        "conflict resolved against it".to_string(),
                    ));
                }
            }
            ResolverOutcome::Deferred => {
                entries.push((
                    change.change_id,
                    Disposition::DeferredManual,
                    "manual resolution pending".to_string(),
                ));
            }
        }
    }

    Ok(ReducerOutput {
        final_values,
        to_process,
        entries,
        input_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcm_core::{ChangeId, FieldChange, ResolutionStrategy};
    use fcm_storage::{InMemoryChangeStore, InMemoryConflictStore};
    use std::collections::BTreeSet;

    fn change(path: &str, value: &str, ts: DateTime<Utc>) -> FieldChange {
        FieldChange::new(
            ChangeId::new(),
            SessionId::new("s1"),
            StepNumber::new(1),
            FieldPath::parse(path).unwrap(),
            None,
            FieldValue::from(value),
            "u1",
            "User One",
            ts,
        )
    }

    #[test]
    fn empty_queue_yields_empty_output() {
        let changes = InMemoryChangeStore::new();
        let conflicts = InMemoryConflictStore::new();
        let out = reduce(&changes, &conflicts, &SessionId::new("s1"), StepNumber::new(1), Utc::now()).unwrap();
        assert!(out.final_values.is_empty());
        assert!(out.to_process.is_empty());
        assert_eq!(out.input_count, 0);
    }

    #[test]
    fn conflict_free_changes_are_all_applied() {
        let changes = InMemoryChangeStore::new();
        let conflicts = InMemoryConflictStore::new();
        let c1 = change("a", "1", Utc::now());
        let c2 = change("b", "2", Utc::now() + chrono::Duration::microseconds(1));
        changes.append(c1.clone()).unwrap();
        changes.append(c2.clone()).unwrap();

        let out = reduce(&changes, &conflicts, &SessionId::new("s1"), StepNumber::new(1), Utc::now()).unwrap();
        assert_eq!(out.final_values.len(), 2);
        assert_eq!(out.to_process.len(), 2);
        assert!(out.entries.iter().all(|(_, d, _)| *d == Disposition::Applied));
    }

    #[test]
    fn conflicted_field_resolves_once_and_marks_loser_shadowed() {
        let changes = InMemoryChangeStore::new();
        let conflicts = InMemoryConflictStore::new();
        let t0 = Utc::now();
        let c1 = change("a", "first", t0);
        let c2 = change("a", "second", t0 + chrono::Duration::microseconds(1));
        changes.append(c1.clone()).unwrap();
        changes.append(c2.clone()).unwrap();
        changes.set_conflict_detected(&[c1.change_id, c2.change_id], true).unwrap();
        let ids: BTreeSet<ChangeId> = [c1.change_id, c2.change_id].into_iter().collect();
        conflicts
            .open_if_absent(
                &SessionId::new("s1"),
                StepNumber::new(1),
                &FieldPath::parse("a").unwrap(),
                ids,
                ResolutionStrategy::FifoWins,
                t0,
            )
            .unwrap();

        let out = reduce(&changes, &conflicts, &SessionId::new("s1"), StepNumber::new(1), Utc::now()).unwrap();
        assert_eq!(out.final_values.get(&FieldPath::parse("a").unwrap()), Some(&FieldValue::from("first")));
        assert_eq!(out.to_process.len(), 2);
        let applied_count = out.entries.iter().filter(|(_, d, _)| *d == Disposition::Applied).count();
        let shadowed_count = out.entries.iter().filter(|(_, d, _)| *d == Disposition::ShadowedByConflictLoss).count();
        assert_eq!(applied_count, 1);
        assert_eq!(shadowed_count, 1);
        assert!(conflicts.open_for(&SessionId::new("s1"), None).unwrap().is_empty());
    }

    #[test]
    fn manual_conflict_defers_and_excludes_field() {
        let changes = InMemoryChangeStore::new();
        let conflicts = InMemoryConflictStore::new();
        let t0 = Utc::now();
        let c1 = change("a", "first", t0);
        let c2 = change("a", "second", t0 + chrono::Duration::microseconds(1));
        changes.append(c1.clone()).unwrap();
        changes.append(c2.clone()).unwrap();
        changes.set_conflict_detected(&[c1.change_id, c2.change_id], true).unwrap();
        let ids: BTreeSet<ChangeId> = [c1.change_id, c2.change_id].into_iter().collect();
        conflicts
            .open_if_absent(
                &SessionId::new("s1"),
                StepNumber::new(1),
                &FieldPath::parse("a").unwrap(),
                ids,
                ResolutionStrategy::Manual,
                t0,
            )
            .unwrap();

        let out = reduce(&changes, &conflicts, &SessionId::new("s1"), StepNumber::new(1), Utc::now()).unwrap();
        assert!(out.final_values.is_empty());
        assert!(out.to_process.is_empty());
        assert!(out.entries.iter().all(|(_, d, _)| *d == Disposition::DeferredManual));
        assert_eq!(conflicts.open_for(&SessionId::new("s1"), None).unwrap().len(), 1);
    }

    #[test]
    fn a_conflict_closed_ahead_of_flush_is_applied_and_processed_by_this_flush() {
        let changes = InMemoryChangeStore::new();
        let conflicts = InMemoryConflictStore::new();
        let t0 = Utc::now();
        let c1 = change("a", "first", t0);
        let c2 = change("a", "second", t0 + chrono::Duration::microseconds(1));
        changes.append(c1.clone()).unwrap();
        changes.append(c2.clone()).unwrap();
        changes.set_conflict_detected(&[c1.change_id, c2.change_id], true).unwrap();
        let ids: BTreeSet<ChangeId> = [c1.change_id, c2.change_id].into_iter().collect();
        let conflict = conflicts
            .open_if_absent(&SessionId::new("s1"), StepNumber::new(1), &FieldPath::parse("a").unwrap(), ids, ResolutionStrategy::Manual, t0)
            .unwrap();
        conflicts
            .close(conflict.conflict_id, Utc::now(), "operator-1", FieldValue::from("first"))
            .unwrap();

        let out = reduce(&changes, &conflicts, &SessionId::new("s1"), StepNumber::new(1), Utc::now()).unwrap();
        assert_eq!(out.final_values.get(&FieldPath::parse("a").unwrap()), Some(&FieldValue::from("first")));
        assert_eq!(out.to_process.len(), 2);
        let applied_count = out.entries.iter().filter(|(_, d, _)| *d == Disposition::Applied).count();
        let shadowed_count = out.entries.iter().filter(|(_, d, _)| *d == Disposition::ShadowedByConflictLoss).count();
        assert_eq!(applied_count, 1);
        assert_eq!(shadowed_count, 1);
    }
}
