//! The durable record of detected conflicts and their resolutions

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fcm_core::{ChangeId, Error, FieldConflict, FieldPath, FieldValue, ResolutionStrategy, Result, SessionId, StepNumber};
use std::collections::BTreeSet;

type OpenKey = (SessionId, StepNumber, FieldPath);

/// Durable storage for [`FieldConflict`] records
///
/// At most one open record exists per `(session, step, field_path)` at any
/// time; closed records are retained indefinitely for audit.
pub trait ConflictStore: Send + Sync {
    /// Open a new conflict, or extend the existing open one on this field
    /// path with the additional member change ids
    fn open_if_absent(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
        change_ids: BTreeSet<ChangeId>,
        strategy: ResolutionStrategy,
        detected_at: DateTime<Utc>,
    ) -> Result<FieldConflict>;

    /// Close an open conflict with its resolution
    fn close(
        &self,
        conflict_id: ChangeId,
        resolved_at: DateTime<Utc>,
        resolved_by: &str,
        final_value: FieldValue,
    ) -> Result<FieldConflict>;

    /// The currently open conflict, if any, for `(session, step, field_path)`
    fn open_for_field(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
    ) -> Result<Option<FieldConflict>>;

    /// All open conflicts for a session, optionally restricted to one step
    fn open_for(&self, session: &SessionId, step: Option<StepNumber>) -> Result<Vec<FieldConflict>>;

    /// Look up any conflict (open or closed) by id
    fn get(&self, conflict_id: ChangeId) -> Result<Option<FieldConflict>>;

    /// The most recently opened conflict for `(session, step, field_path)`,
    /// open or closed
    ///
    /// Unlike [`ConflictStore::open_for_field`], this keeps returning a
    /// record after it has been closed — it is how a later `Flush` finds the
    /// decision a prior manual resolution already recorded.
    fn for_field(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
    ) -> Result<Option<FieldConflict>>;

    /// Every conflict ever opened for a session, open and resolved, for
    /// stats counters
    fn all_for_session(&self, session: &SessionId) -> Result<Vec<FieldConflict>>;
}

/// A [`ConflictStore`] backed by `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryConflictStore {
    records: DashMap<ChangeId, FieldConflict>,
    open_index: DashMap<OpenKey, ChangeId>,
    field_index: DashMap<OpenKey, ChangeId>,
}

impl InMemoryConflictStore {
    /// Construct an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConflictStore for InMemoryConflictStore {
    fn open_if_absent(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
        change_ids: BTreeSet<ChangeId>,
        strategy: ResolutionStrategy,
        detected_at: DateTime<Utc>,
    ) -> Result<FieldConflict> {
        let key: OpenKey = (session.clone(), step, field_path.clone());
        if let Some(conflict_id) = self.open_index.get(&key).map(|v| *v) {
            let mut entry = self
                .records
                .get_mut(&conflict_id)
                .ok_or_else(|| Error::Internal("open index referenced missing conflict".into()))?;
            entry.conflicting_changes.extend(change_ids);
            return Ok(entry.clone());
        }
        let conflict = FieldConflict::open(
            ChangeId::new(),
            session.clone(),
            step,
            field_path.clone(),
            change_ids,
            detected_at,
            strategy,
        );
        self.open_index.insert(key.clone(), conflict.conflict_id);
        self.field_index.insert(key, conflict.conflict_id);
        self.records.insert(conflict.conflict_id, conflict.clone());
        Ok(conflict)
    }

    fn close(
        &self,
        conflict_id: ChangeId,
        resolved_at: DateTime<Utc>,
        resolved_by: &str,
        final_value: FieldValue,
    ) -> Result<FieldConflict> {
        let mut entry = self
            .records
            .get_mut(&conflict_id)
            .ok_or(Error::ConflictNotFound(conflict_id))?;
        if !entry.is_open() {
            return Err(Error::AlreadyResolved(conflict_id));
        }
        entry.close(resolved_at, resolved_by, final_value);
        let key: OpenKey = (
            entry.session_id.clone(),
            entry.step_number,
            entry.field_path.clone(),
        );
        drop(entry);
        self.open_index.remove(&key);
        Ok(self.records.get(&conflict_id).unwrap().clone())
    }

    fn open_for_field(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
    ) -> Result<Option<FieldConflict>> {
        let key: OpenKey = (session.clone(), step, field_path.clone());
        Ok(self
            .open_index
            .get(&key)
            .and_then(|id| self.records.get(&*id).map(|r| r.clone())))
    }

    fn open_for(&self, session: &SessionId, step: Option<StepNumber>) -> Result<Vec<FieldConflict>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| {
                let c = entry.value();
                c.is_open()
                    && &c.session_id == session
                    && step.map(|s| c.step_number == s).unwrap_or(true)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn get(&self, conflict_id: ChangeId) -> Result<Option<FieldConflict>> {
        Ok(self.records.get(&conflict_id).map(|r| r.clone()))
    }

    fn for_field(
        &self,
        session: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
    ) -> Result<Option<FieldConflict>> {
        let key: OpenKey = (session.clone(), step, field_path.clone());
        Ok(self
            .field_index
            .get(&key)
            .and_then(|id| self.records.get(&*id).map(|r| r.clone())))
    }

    fn all_for_session(&self, session: &SessionId) -> Result<Vec<FieldConflict>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| &entry.value().session_id == session)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
