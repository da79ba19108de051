//! The append-only queue of [`FieldChange`] records

use dashmap::DashMap;
use fcm_core::{ChangeId, Error, FieldChange, FieldPath, Result, SessionId, StepNumber};
use std::sync::RwLock;

/// Durable storage for queued field changes
///
/// Mirrors the `field_change_queue` collection contract: unique insert by
/// `change_id`, FIFO-ordered queries scoped to `(session, step[, field_path])`,
/// and an idempotent processed-marking transition.
pub trait ChangeStore: Send + Sync {
    /// Durably persist a new change; rejects a reused `change_id`
    fn append(&self, change: FieldChange) -> Result<()>;

    /// All unprocessed changes for `(session, step)`, FIFO ordered
    fn pending_for(&self, session: &SessionId, step: StepNumber) -> Result<Vec<FieldChange>>;

    /// All unprocessed changes for `(session, step, field_path)`, FIFO ordered
    fn pending_for_field(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
    ) -> Result<Vec<FieldChange>>;

    /// Atomically flip the given changes to `is_processed = true`
    ///
    /// Idempotent: change ids already processed are left untouched, not
    /// treated as an error.
    fn mark_processed(&self, change_ids: &[ChangeId]) -> Result<()>;

    /// Flip `conflict_detected` on the given changes
    fn set_conflict_detected(&self, change_ids: &[ChangeId], detected: bool) -> Result<()>;

    /// Full audit view for `(session, field_path)`, processed and
    /// unprocessed, FIFO ordered
    fn history(&self, session: &SessionId, field_path: &FieldPath) -> Result<Vec<FieldChange>>;

    /// Look up a single change by id
    fn get(&self, change_id: ChangeId) -> Result<Option<FieldChange>>;

    /// Every change ever appended for a session, across all steps, for
    /// stats counters and retention cleanup
    fn all_for_session(&self, session: &SessionId) -> Result<Vec<FieldChange>>;

    /// Remove changes older than the given cutoff, for retention cleanup
    ///
    /// Returns the number of changes removed.
    fn delete_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<usize>;
}

fn poisoned(what: &str) -> Error {
    Error::Unavailable(format!("{what} lock poisoned"))
}

fn ordering_key(change: &FieldChange) -> (chrono::DateTime<chrono::Utc>, ChangeId) {
    (change.timestamp, change.change_id)
}

/// A [`ChangeStore`] backed by a `DashMap` sharded per [`SessionId`]
///
/// One shard per session, guarded by its own `RwLock<Vec<FieldChange>>` — a
/// flat append log rather than a version chain, since changes are never
/// rewritten, only flagged.
#[derive(Debug, Default)]
pub struct InMemoryChangeStore {
    by_session: DashMap<SessionId, RwLock<Vec<FieldChange>>>,
    index: DashMap<ChangeId, SessionId>,
}

impl InMemoryChangeStore {
    /// Construct an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeStore for InMemoryChangeStore {
    fn append(&self, change: FieldChange) -> Result<()> {
        if self.index.contains_key(&change.change_id) {
            return Err(Error::DuplicateChangeId(change.change_id));
        }
        let shard = self
            .by_session
            .entry(change.session_id.clone())
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut guard = shard.write().map_err(|_| poisoned("change shard"))?;
        self.index.insert(change.change_id, change.session_id.clone());
        guard.push(change);
        Ok(())
    }

    fn pending_for(&self, session: &SessionId, step: StepNumber) -> Result<Vec<FieldChange>> {
        let Some(shard) = self.by_session.get(session) else {
            return Ok(Vec::new());
        };
        let guard = shard.read().map_err(|_| poisoned("change shard"))?;
        let mut out: Vec<FieldChange> = guard
            .iter()
            .filter(|c| c.step_number == step && !c.is_processed)
            .cloned()
            .collect();
        out.sort_by_key(ordering_key);
        Ok(out)
    }

    fn pending_for_field(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
    ) -> Result<Vec<FieldChange>> {
        let Some(shard) = self.by_session.get(session) else {
            return Ok(Vec::new());
        };
        let guard = shard.read().map_err(|_| poisoned("change shard"))?;
        let mut out: Vec<FieldChange> = guard
            .iter()
            .filter(|c| c.step_number == step && !c.is_processed && &c.field_path == field_path)
            .cloned()
            .collect();
        out.sort_by_key(ordering_key);
        Ok(out)
    }

    fn mark_processed(&self, change_ids: &[ChangeId]) -> Result<()> {
        for change_id in change_ids {
            let Some(session) = self.index.get(change_id).map(|s| s.clone()) else {
                continue;
            };
            if let Some(shard) = self.by_session.get(&session) {
                let mut guard = shard.write().map_err(|_| poisoned("change shard"))?;
                if let Some(change) = guard.iter_mut().find(|c| &c.change_id == change_id) {
                    change.is_processed = true;
                }
            }
        }
        Ok(())
    }

    fn set_conflict_detected(&self, change_ids: &[ChangeId], detected: bool) -> Result<()> {
        for change_id in change_ids {
            let Some(session) = self.index.get(change_id).map(|s| s.clone()) else {
                continue;
            };
            if let Some(shard) = self.by_session.get(&session) {
                let mut guard = shard.write().map_err(|_| poisoned("change shard"))?;
                if let Some(change) = guard.iter_mut().find(|c| &c.change_id == change_id) {
                    change.conflict_detected = detected;
                }
            }
        }
        Ok(())
    }

    fn history(&self, session: &SessionId, field_path: &FieldPath) -> Result<Vec<FieldChange>> {
        let Some(shard) = self.by_session.get(session) else {
            return Ok(Vec::new());
        };
        let guard = shard.read().map_err(|_| poisoned("change shard"))?;
        let mut out: Vec<FieldChange> = guard
            .iter()
            .filter(|c| &c.field_path == field_path)
            .cloned()
            .collect();
        out.sort_by_key(ordering_key);
        Ok(out)
    }

    fn get(&self, change_id: ChangeId) -> Result<Option<FieldChange>> {
        let Some(session) = self.index.get(&change_id).map(|s| s.clone()) else {
            return Ok(None);
        };
        let Some(shard) = self.by_session.get(&session) else {
            return Ok(None);
        };
        let guard = shard.read().map_err(|_| poisoned("change shard"))?;
        Ok(guard.iter().find(|c| c.change_id == change_id).cloned())
    }

    fn all_for_session(&self, session: &SessionId) -> Result<Vec<FieldChange>> {
        let Some(shard) = self.by_session.get(session) else {
            return Ok(Vec::new());
        };
        let guard = shard.read().map_err(|_| poisoned("change shard"))?;
        let mut out: Vec<FieldChange> = guard.iter().cloned().collect();
        out.sort_by_key(ordering_key);
        Ok(out)
    }

    fn delete_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<usize> {
        let mut removed = 0;
        for shard in self.by_session.iter() {
            let mut guard = shard.write().map_err(|_| poisoned("change shard"))?;
            let before_ids: Vec<ChangeId> = guard.iter().map(|c| c.change_id).collect();
            guard.retain(|c| c.timestamp >= cutoff || !c.is_processed);
            let after_ids: std::collections::HashSet<ChangeId> =
                guard.iter().map(|c| c.change_id).collect();
            for id in before_ids {
                if !after_ids.contains(&id) {
                    self.index.remove(&id);
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcm_core::FieldValue;
    use chrono::Utc;

    fn change(session: &str, step: u32, path: &str, ts: chrono::DateTime<Utc>) -> FieldChange {
        FieldChange::new(
            ChangeId::new(),
            SessionId::new(session),
            StepNumber::new(step),
            FieldPath::parse(path).unwrap(),
            None,
            FieldValue::from("v"),
            "u1",
            "User One",
            ts,
        )
    }

    #[test]
    fn append_rejects_duplicate_change_id() {
        let store = InMemoryChangeStore::new();
        let c = change("s1", 1, "a", Utc::now());
        let dup = c.clone();
        store.append(c).unwrap();
        let err = store.append(dup).unwrap_err();
        assert!(matches!(err, Error::DuplicateChangeId(_)));
    }

    #[test]
    fn pending_for_orders_by_timestamp() {
        let store = InMemoryChangeStore::new();
        let t0 = Utc::now();
        let c1 = change("s1", 1, "a", t0);
        let c2 = change("s1", 1, "b", t0 + chrono::Duration::microseconds(1));
        let id1 = c1.change_id;
        let id2 = c2.change_id;
        store.append(c2).unwrap();
        store.append(c1).unwrap();
        let pending = store.pending_for(&SessionId::new("s1"), StepNumber::new(1)).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].change_id, id1);
        assert_eq!(pending[1].change_id, id2);
    }

    #[test]
    fn mark_processed_excludes_from_pending() {
        let store = InMemoryChangeStore::new();
        let c = change("s1", 1, "a", Utc::now());
        let id = c.change_id;
        store.append(c).unwrap();
        store.mark_processed(&[id]).unwrap();
        let pending = store.pending_for(&SessionId::new("s1"), StepNumber::new(1)).unwrap();
        assert!(pending.is_empty());
        assert!(store.get(id).unwrap().unwrap().is_processed);
    }

    #[test]
    fn mark_processed_is_idempotent() {
        let store = InMemoryChangeStore::new();
        let c = change("s1", 1, "a", Utc::now());
        let id = c.change_id;
        store.append(c).unwrap();
        store.mark_processed(&[id]).unwrap();
        store.mark_processed(&[id]).unwrap();
        assert!(store.get(id).unwrap().unwrap().is_processed);
    }

    #[test]
    fn history_includes_processed_and_unprocessed() {
        let store = InMemoryChangeStore::new();
        let c = change("s1", 1, "a", Utc::now());
        let id = c.change_id;
        store.append(c).unwrap();
        store.mark_processed(&[id]).unwrap();
        let hist = store.history(&SessionId::new("s1"), &FieldPath::parse("a").unwrap()).unwrap();
        assert_eq!(hist.len(), 1);
    }

    #[test]
    fn delete_older_than_purges_only_processed_changes() {
        let store = InMemoryChangeStore::new();
        let old = Utc::now() - chrono::Duration::days(90);
        let processed = change("s1", 1, "a", old);
        let processed_id = processed.change_id;
        let pending = change("s1", 1, "b", old);
        let pending_id = pending.change_id;
        store.append(processed).unwrap();
        store.append(pending).unwrap();
        store.mark_processed(&[processed_id]).unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        let removed = store.delete_older_than(cutoff).unwrap();

        assert_eq!(removed, 1);
        assert!(store.get(processed_id).unwrap().is_none());
        assert!(store.get(pending_id).unwrap().is_some());
    }
}
