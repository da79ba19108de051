//! The `fifo_processing_logs` append-only collection

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fcm_core::{AuditEntry, Error, Result, SessionId};
use std::sync::RwLock;

/// Append-only storage for [`AuditEntry`] records
pub trait AuditLog: Send + Sync {
    /// Append a new entry; never fails except on storage unavailability
    fn record(&self, entry: AuditEntry) -> Result<()>;

    /// All recorded entries for a session, oldest first
    fn entries_for(&self, session: &SessionId) -> Result<Vec<AuditEntry>>;

    /// Remove entries older than the given cutoff, for retention cleanup
    ///
    /// Returns the number of entries removed.
    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// An [`AuditLog`] backed by `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    by_session: DashMap<SessionId, RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    /// Construct an empty log
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<()> {
        for line in entry.render_lines() {
            tracing::info!(target: "fcm_durability::audit", "{line}");
        }
        let shard = self
            .by_session
            .entry(entry.session_id.clone())
            .or_insert_with(|| RwLock::new(Vec::new()));
        let mut guard = shard
            .write()
            .map_err(|_| Error::Unavailable("audit log shard lock poisoned".to_string()))?;
        guard.push(entry);
        Ok(())
    }

    fn entries_for(&self, session: &SessionId) -> Result<Vec<AuditEntry>> {
        let Some(shard) = self.by_session.get(session) else {
            return Ok(Vec::new());
        };
        let guard = shard
            .read()
            .map_err(|_| Error::Unavailable("audit log shard lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for shard in self.by_session.iter() {
            let mut guard = shard
                .write()
                .map_err(|_| Error::Unavailable("audit log shard lock poisoned".to_string()))?;
            let before = guard.len();
            guard.retain(|e| e.timestamp >= cutoff);
            removed += before - guard.len();
        }
        Ok(removed)
    }
}
