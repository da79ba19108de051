//! ChangeManager (C8): the public facade coordinating C1–C7

use crate::applier;
use crate::config::ChangeManagerConfig;
use crate::detector::ConflictDetector;
use crate::reducer::reduce;
use crate::resolver::{resolve, ResolverOutcome};
use chrono::Duration;
use dashmap::DashMap;
use fcm_core::{
    ChangeId, Clock, Error, FieldChange, FieldConflict, FieldPath, FieldValue,
    ResolutionStrategy, Result, SessionId, StepNumber,
};
use fcm_durability::AuditLog;
use fcm_storage::{ChangeStore, ConflictStore, DocumentStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything needed to enqueue a new field change
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    /// Session the change belongs to
    pub session_id: SessionId,
    /// Step the change belongs to
    pub step_number: StepNumber,
    /// Dot-separated path into the step's document, validated at enqueue
    pub field_path: String,
    /// Snapshot the client observed before editing; advisory only
    pub old_value: Option<FieldValue>,
    /// The value to write
    pub new_value: FieldValue,
    /// Opaque identifier of the originating user
    pub user_id: String,
    /// Opaque display name of the originating user
    pub user_name: String,
    /// Caller-supplied id, for idempotent retries; a fresh one is minted if
    /// omitted
    pub change_id: Option<ChangeId>,
    /// Advisory strategy hint, consulted only if this change opens a new
    /// conflict on its field path
    pub resolution_strategy: Option<ResolutionStrategy>,
}

/// The result of an `Enqueue` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// The change's id — the caller-supplied one if given, else newly minted
    pub change_id: ChangeId,
    /// True unless this call was a duplicate of an already-stored change
    pub accepted: bool,
    /// True if `change_id` was already present (idempotent retry)
    pub duplicate: bool,
}

/// The result of a `Flush` call
#[derive(Debug, Clone, PartialEq)]
pub struct FlushSummary {
    /// How many pending changes were read at the start of this flush
    pub changes_queued: usize,
    /// How many changes were marked processed
    pub changes_applied: usize,
    /// How many conflicts on this step remain open (deferred manual)
    pub conflicts_unresolved: usize,
    /// The field→value map actually written, if any
    pub final_values: Option<BTreeMap<FieldPath, FieldValue>>,
}

/// Counters returned by `GetStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeManagerStats {
    /// Total changes ever enqueued for the session
    pub queued: usize,
    /// Changes marked processed
    pub processed: usize,
    /// Changes still pending
    pub pending: usize,
    /// Conflicts currently open
    pub open_conflicts: usize,
    /// Conflicts that have been resolved
    pub resolved_conflicts: usize,
}

/// The result of a `Cleanup` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Changes removed across all sessions
    pub changes_removed: usize,
    /// Audit log entries removed across all sessions
    pub logs_removed: usize,
}

/// Coordinates the Clock, stores, detector, resolver, reducer and applier
/// behind a single per-session-serialized API
///
/// `Flush` for a given session never runs concurrently with another `Flush`
/// for the same session: both take the same per-`SessionId` lock out of a
/// `DashMap`, the same shape as a per-key commit-serialization map.
/// `Enqueue` does not take this lock — the in-memory stores' own per-key
/// locking already gives `Flush`'s `PendingFor` read a consistent view of
/// appends that completed-before versus after lock acquisition.
pub struct ChangeManager {
    clock: Arc<dyn Clock>,
    changes: Arc<dyn ChangeStore>,
    conflicts: Arc<dyn ConflictStore>,
    documents: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditLog>,
    detector: ConflictDetector,
    config: ChangeManagerConfig,
    session_locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl ChangeManager {
    /// Construct a manager over the given stores and configuration
    pub fn new(
        clock: Arc<dyn Clock>,
        changes: Arc<dyn ChangeStore>,
        conflicts: Arc<dyn ConflictStore>,
        documents: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditLog>,
        config: ChangeManagerConfig,
    ) -> Self {
        let detector = ConflictDetector::new(changes.clone(), conflicts.clone(), config.default_strategy);
        Self {
            clock,
            changes,
            conflicts,
            documents,
            audit,
            detector,
            config,
            session_locks: DashMap::new(),
        }
    }

    fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Validate, stamp, and durably append a new field change
    ///
    /// Never blocks on a flush. A reused `change_id` is reported as a
    /// non-accepted duplicate rather than an error.
    pub fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueOutcome> {
        let field_path = FieldPath::parse(request.field_path)?;
        let change_id = request.change_id.unwrap_or_default();
        let timestamp = self.clock.now();
        let mut change = FieldChange::new(
            change_id,
            request.session_id,
            request.step_number,
            field_path,
            request.old_value,
            request.new_value,
            request.user_id,
            request.user_name,
            timestamp,
        );
        if let Some(strategy) = request.resolution_strategy {
            change = change.with_resolution_strategy(strategy);
        }

        match self.changes.append(change.clone()) {
            Ok(()) => {
                self.detector.on_appended(&change)?;
                tracing::info!(
                    change_id = %change_id,
                    session = %change.session_id,
                    step = change.step_number.as_u32(),
                    field = %change.field_path,
                    "change enqueued"
                );
                Ok(EnqueueOutcome {
                    change_id,
                    accepted: true,
                    duplicate: false,
                })
            }
            Err(Error::DuplicateChangeId(_)) => Ok(EnqueueOutcome {
                change_id,
                accepted: false,
                duplicate: true,
            }),
            Err(e) => Err(e),
        }
    }

    /// Drain and apply a step's pending queue
    ///
    /// Takes the session's serialization lock for the whole
    /// read-reduce-apply-mark-audit sequence. If the document commit fails,
    /// no change is marked processed and no audit entry is written — a
    /// retried flush will deterministically re-derive the same result.
    pub fn flush(&self, session_id: &SessionId, step: StepNumber) -> Result<FlushSummary> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock();

        let now = self.clock.now();
        let output = reduce(&*self.changes, &*self.conflicts, session_id, step, now)?;

        if !output.final_values.is_empty() {
            applier::apply(&*self.documents, session_id, step, &output.final_values, now)?;
        }

        self.changes.mark_processed(&output.to_process)?;

        let audit_entry = fcm_core::AuditEntry::new(
            session_id.clone(),
            step,
            now,
            output.input_count,
            output.final_values.len(),
            output.entries,
        );
        self.audit.record(audit_entry)?;

        let conflicts_unresolved = self.conflicts.open_for(session_id, Some(step))?.len();

        Ok(FlushSummary {
            changes_queued: output.input_count,
            changes_applied: output.to_process.len(),
            conflicts_unresolved,
            final_values: if output.final_values.is_empty() {
                None
            } else {
                Some(output.final_values)
            },
        })
    }

    /// Decide a `manual` conflict's winning value
    ///
    /// `strategy` lets an operator pick a concrete strategy to apply
    /// retroactively; if it is [`ResolutionStrategy::Manual`], `final_value`
    /// must be supplied directly. This only closes the conflict record —
    /// the document write and the member changes' `is_processed` transition
    /// happen on the next `Flush` for this step, which is the only place
    /// visible state changes. A caller that wants to observe the decided
    /// value must call `flush` after this returns.
    pub fn resolve_manual(
        &self,
        session_id: &SessionId,
        step: StepNumber,
        field_path: &FieldPath,
        strategy: ResolutionStrategy,
        final_value: Option<FieldValue>,
        resolved_by: &str,
    ) -> Result<()> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock();

        let conflict = self
            .conflicts
            .open_for_field(session_id, step, field_path)?
            .ok_or_else(|| Error::NoOpenConflict {
                session_id: session_id.to_string(),
                step_number: step.as_u32(),
                field_path: field_path.to_string(),
            })?;
        if !conflict.is_open() {
            return Err(Error::AlreadyResolved(conflict.conflict_id));
        }

        let decided_value = if strategy == ResolutionStrategy::Manual {
            final_value.ok_or(Error::ResolutionValueRequired(ResolutionStrategy::Manual))?
        } else {
            let members = self.changes.pending_for_field(session_id, step, field_path)?;
            match resolve(strategy, &members) {
                ResolverOutcome::Decided { final_value, .. } => final_value,
                ResolverOutcome::Deferred => {
                    return Err(Error::ResolutionValueRequired(strategy));
                }
            }
        };

        let now = self.clock.now();
        self.conflicts
            .close(conflict.conflict_id, now, resolved_by, decided_value)?;

        tracing::info!(
            conflict_id = %conflict.conflict_id,
            session = %session_id,
            step = step.as_u32(),
            field = %field_path,
            resolved_by,
            "conflict resolved manually, pending next flush"
        );

        Ok(())
    }

    /// Counters for a session's queue and conflicts
    pub fn stats(&self, session_id: &SessionId) -> Result<ChangeManagerStats> {
        let changes = self.changes.all_for_session(session_id)?;
        let conflicts = self.conflicts.all_for_session(session_id)?;
        let processed = changes.iter().filter(|c| c.is_processed).count();
        let open_conflicts = conflicts.iter().filter(|c| c.is_open()).count();
        Ok(ChangeManagerStats {
            queued: changes.len(),
            processed,
            pending: changes.len() - processed,
            open_conflicts,
            resolved_conflicts: conflicts.len() - open_conflicts,
        })
    }

    /// Full history for a session's field path, processed and unprocessed
    pub fn history(&self, session_id: &SessionId, field_path: &FieldPath) -> Result<Vec<FieldChange>> {
        self.changes.history(session_id, field_path)
    }

    /// Open conflicts for a session, optionally restricted to one step
    pub fn open_conflicts(&self, session_id: &SessionId, step: Option<StepNumber>) -> Result<Vec<FieldConflict>> {
        self.conflicts.open_for(session_id, step)
    }

    /// Purge changes and audit entries older than `older_than_days`
    pub fn cleanup(&self, older_than_days: u32) -> Result<CleanupSummary> {
        let cutoff = self.clock.now() - Duration::days(i64::from(older_than_days));
        let changes_removed = self.changes.delete_older_than(cutoff)?;
        let logs_removed = self.audit.delete_older_than(cutoff)?;
        tracing::info!(older_than_days, changes_removed, logs_removed, "retention cleanup ran");
        Ok(CleanupSummary {
            changes_removed,
            logs_removed,
        })
    }

    /// The configured default resolution strategy and retention window
    pub fn config(&self) -> &ChangeManagerConfig {
        &self.config
    }
}
