//! [`FieldChange`]: the unit of work queued against a workflow step

use crate::{ChangeId, FieldPath, FieldValue, ResolutionStrategy, SessionId, StepNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single field-scoped edit, immutable once enqueued
///
/// `change_id` is unique for the lifetime of the system — exactly one
/// `FieldChange` record may ever exist per id. The only fields that ever
/// change after insertion are `is_processed` and `conflict_detected`, both
/// monotone false→true transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Globally unique identifier for this change
    pub change_id: ChangeId,
    /// The session this change belongs to
    pub session_id: SessionId,
    /// The step within the session this change belongs to
    pub step_number: StepNumber,
    /// Dot-separated path into the step's nested document
    pub field_path: FieldPath,
    /// Snapshot the client observed before editing; advisory only, never
    /// consulted for ordering or conflict detection
    pub old_value: Option<FieldValue>,
    /// The value to write
    pub new_value: FieldValue,
    /// Opaque identifier of the originating user
    pub user_id: String,
    /// Opaque display name of the originating user
    pub user_name: String,
    /// Monotonic ordering key assigned at enqueue time
    pub timestamp: DateTime<Utc>,
    /// True once a flush has included this change in its output
    pub is_processed: bool,
    /// True iff a conflict record links this change to others on the same
    /// field path
    pub conflict_detected: bool,
    /// Advisory strategy hint the submitting client attached
    ///
    /// Consulted by the conflict detector only when it opens a *new*
    /// conflict on this field path — the first contending change's hint
    /// becomes that conflict's strategy. Does not override a session's
    /// default strategy once a conflict already exists.
    pub resolution_strategy: Option<ResolutionStrategy>,
}

impl FieldChange {
    /// Construct a new, unprocessed, conflict-free change
    ///
    /// Callers supply `change_id` themselves (so idempotent retries can
    /// reuse the same id) and the caller's clock stamps `timestamp`; this
    /// constructor does not assign either.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        change_id: ChangeId,
        session_id: SessionId,
        step_number: StepNumber,
        field_path: FieldPath,
        old_value: Option<FieldValue>,
        new_value: FieldValue,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            change_id,
            session_id,
            step_number,
            field_path,
            old_value,
            new_value,
            user_id: user_id.into(),
            user_name: user_name.into(),
            timestamp,
            is_processed: false,
            conflict_detected: false,
            resolution_strategy: None,
        }
    }

    /// Attach an advisory resolution-strategy hint, builder-style
    pub fn with_resolution_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.resolution_strategy = Some(strategy);
        self
    }
}
