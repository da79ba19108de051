//! ConflictDetector (C4): opens or extends a conflict on every contested append

use fcm_core::{FieldChange, ResolutionStrategy, Result};
use fcm_storage::{ChangeStore, ConflictStore};
use std::sync::Arc;

/// Watches every successful append for contention on the same field path
///
/// Holds no state of its own beyond the stores it was handed — it is a pure
/// coordination step between [`ChangeStore`] and [`ConflictStore`].
pub struct ConflictDetector {
    changes: Arc<dyn ChangeStore>,
    conflicts: Arc<dyn ConflictStore>,
    default_strategy: ResolutionStrategy,
}

impl ConflictDetector {
    /// Construct a detector using `default_strategy` whenever a newly
    /// appended change carries no strategy hint of its own
    pub fn new(
        changes: Arc<dyn ChangeStore>,
        conflicts: Arc<dyn ConflictStore>,
        default_strategy: ResolutionStrategy,
    ) -> Self {
        Self {
            changes,
            conflicts,
            default_strategy,
        }
    }

    /// Inspect the field path of a just-appended change and open or extend a
    /// conflict record if two or more unprocessed changes now target it
    ///
    /// No-op, and no writes occur, when the field has a single pending
    /// change.
    pub fn on_appended(&self, change: &FieldChange) -> Result<()> {
        let pending = self.changes.pending_for_field(
            &change.session_id,
            change.step_number,
            &change.field_path,
        )?;
        if pending.len() < 2 {
            return Ok(());
        }

        let strategy = change.resolution_strategy.unwrap_or(self.default_strategy);
        let member_ids = pending.iter().map(|c| c.change_id).collect();
        let conflict = self.conflicts.open_if_absent(
            &change.session_id,
            change.step_number,
            &change.field_path,
            member_ids,
            strategy,
            change.timestamp,
        )?;

        tracing::info!(
            conflict_id = %conflict.conflict_id,
            session = %change.session_id,
            step = change.step_number.as_u32(),
            field = %change.field_path,
            members = conflict.conflicting_changes.len(),
            "field conflict detected"
        );

        self.changes.set_conflict_detected(
            &conflict.conflicting_changes.iter().copied().collect::<Vec<_>>(),
            true,
        )?;
        Ok(())
    }
}
