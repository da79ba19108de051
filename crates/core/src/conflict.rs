//! [`FieldConflict`] and the pluggable [`ResolutionStrategy`]

use crate::{ChangeId, FieldPath, FieldValue, SessionId, StepNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which policy decides the winner among a contested field's member changes
///
/// All four strategies are pure functions of the conflict's member changes
/// at flush time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// The member with the smallest timestamp (earliest enqueue) wins
    FifoWins,
    /// The member with the largest timestamp wins
    LatestWins,
    /// If every member value is an object, recursively merge keys with
    /// later timestamps overriding overlapping leaves; otherwise degrades
    /// to `LatestWins`
    Merge,
    /// Defer to a human operator; the conflict stays open and no member is
    /// applied until [`crate::conflict::FieldConflict`] is closed explicitly
    Manual,
}

/// A contested field path with two or more unprocessed member changes
///
/// At most one open (`resolved_at.is_none()`) record exists per
/// `(session_id, step_number, field_path)` at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    /// Identifier of this conflict record
    pub conflict_id: ChangeId,
    /// Session the contested field belongs to
    pub session_id: SessionId,
    /// Step the contested field belongs to
    pub step_number: StepNumber,
    /// The contested field path
    pub field_path: FieldPath,
    /// Member changes whose pending writes target this field path
    pub conflicting_changes: BTreeSet<ChangeId>,
    /// When this record was first opened
    pub detected_at: DateTime<Utc>,
    /// The strategy that will (or did) decide the winner
    pub resolution_strategy: ResolutionStrategy,
    /// When the conflict was closed, if it has been
    pub resolved_at: Option<DateTime<Utc>>,
    /// Who or what closed the conflict ("fifo-reducer" for automatic
    /// strategies, an operator identity for `manual`)
    pub resolved_by: Option<String>,
    /// The value written to the field once resolved
    pub final_value: Option<FieldValue>,
}

impl FieldConflict {
    /// Open a new conflict record for the given field path and membership
    ///
    /// Panics if `conflicting_changes` holds fewer than two entries — a
    /// conflict by definition has at least two contending changes.
    pub fn open(
        conflict_id: ChangeId,
        session_id: SessionId,
        step_number: StepNumber,
        field_path: FieldPath,
        conflicting_changes: BTreeSet<ChangeId>,
        detected_at: DateTime<Utc>,
        resolution_strategy: ResolutionStrategy,
    ) -> Self {
        assert!(
            conflicting_changes.len() >= 2,
            "a conflict requires at least two contending changes"
        );
        Self {
            conflict_id,
            session_id,
            step_number,
            field_path,
            conflicting_changes,
            detected_at,
            resolution_strategy,
            resolved_at: None,
            resolved_by: None,
            final_value: None,
        }
    }

    /// True if this conflict has not yet been closed
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }

    /// Close this conflict with the given decision
    pub fn close(&mut self, resolved_at: DateTime<Utc>, resolved_by: impl Into<String>, final_value: FieldValue) {
        self.resolved_at = Some(resolved_at);
        self.resolved_by = Some(resolved_by.into());
        self.final_value = Some(final_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> BTreeSet<ChangeId> {
        (0..n).map(|_| ChangeId::new()).collect()
    }

    #[test]
    #[should_panic(expected = "at least two")]
    fn opening_with_fewer_than_two_members_panics() {
        FieldConflict::open(
            ChangeId::new(),
            SessionId::new("s"),
            StepNumber::new(1),
            FieldPath::parse("a").unwrap(),
            ids(1),
            Utc::now(),
            ResolutionStrategy::FifoWins,
        );
    }

    #[test]
    fn fresh_conflict_is_open() {
        let c = FieldConflict::open(
            ChangeId::new(),
            SessionId::new("s"),
            StepNumber::new(1),
            FieldPath::parse("a").unwrap(),
            ids(2),
            Utc::now(),
            ResolutionStrategy::FifoWins,
        );
        assert!(c.is_open());
    }

    #[test]
    fn closing_sets_all_resolution_fields() {
        let mut c = FieldConflict::open(
            ChangeId::new(),
            SessionId::new("s"),
            StepNumber::new(1),
            FieldPath::parse("a").unwrap(),
            ids(2),
            Utc::now(),
            ResolutionStrategy::LatestWins,
        );
        c.close(Utc::now(), "fifo-reducer", FieldValue::from("final"));
        assert!(!c.is_open());
        assert_eq!(c.resolved_by.as_deref(), Some("fifo-reducer"));
        assert_eq!(c.final_value, Some(FieldValue::from("final")));
    }
}
