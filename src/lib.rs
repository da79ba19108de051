//! Top-level convenience re-exports and an in-memory default assembly
//!
//! Downstream crates normally depend on `fcm-core`/`fcm-storage`/
//! `fcm-durability`/`fcm-concurrency` directly and wire their own store
//! choices into [`fcm_concurrency::ChangeManager::new`]. This crate exists
//! for callers who just want the in-memory default end to end.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use fcm_concurrency::{
    ChangeManager, ChangeManagerConfig, ChangeManagerStats, CleanupSummary, EnqueueOutcome,
    EnqueueRequest, FlushSummary,
};
pub use fcm_core::{
    AuditEntry, ChangeId, Clock, Disposition, Error, FieldChange, FieldConflict, FieldPath, FieldValue,
    MonotonicClock, PathError, Result, ResolutionStrategy, SessionId, StepNumber,
};
pub use fcm_durability::InMemoryAuditLog;
pub use fcm_storage::{InMemoryChangeStore, InMemoryConflictStore, InMemoryDocumentStore};

use std::sync::Arc;

/// Build a [`ChangeManager`] backed entirely by the in-memory store
/// implementations, with default configuration
pub fn in_memory_manager() -> ChangeManager {
    in_memory_manager_with_config(ChangeManagerConfig::default())
}

/// Build a [`ChangeManager`] backed entirely by the in-memory store
/// implementations, with caller-supplied configuration
pub fn in_memory_manager_with_config(config: ChangeManagerConfig) -> ChangeManager {
    ChangeManager::new(
        Arc::new(MonotonicClock::new()),
        Arc::new(InMemoryChangeStore::new()),
        Arc::new(InMemoryConflictStore::new()),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryAuditLog::new()),
        config,
    )
}
