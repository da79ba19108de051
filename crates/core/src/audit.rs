//! [`AuditEntry`]: the append-only record of a single flush

use crate::{ChangeId, SessionId, StepNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What became of a single change within a flush
///
/// Every change a flush visits ends up in exactly one disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The change's value was written to the document
    Applied,
    /// The change lost a conflict and its value was never written
    ShadowedByConflictLoss,
    /// The change sits in a `manual` conflict that has not been resolved;
    /// it stays pending
    DeferredManual,
}

impl Disposition {
    fn label(self) -> &'static str {
        match self {
            Disposition::Applied => "Applied",
            Disposition::ShadowedByConflictLoss => "Shadowed",
            Disposition::DeferredManual => "Deferred",
        }
    }
}

/// One audit entry per flush attempt, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Session the flush ran against
    pub session_id: SessionId,
    /// Step the flush ran against
    pub step_number: StepNumber,
    /// When the flush ran
    pub timestamp: DateTime<Utc>,
    /// How many changes were read from the pending queue
    pub change_count: usize,
    /// How many distinct field paths ended up in the final value map
    pub field_count: usize,
    /// Per-change outcome, in the order the reducer visited them
    pub entries: Vec<(ChangeId, Disposition, String)>,
}

impl AuditEntry {
    /// Construct a new audit entry for a completed flush
    pub fn new(
        session_id: SessionId,
        step_number: StepNumber,
        timestamp: DateTime<Utc>,
        change_count: usize,
        field_count: usize,
        entries: Vec<(ChangeId, Disposition, String)>,
    ) -> Self {
        Self {
            session_id,
            step_number,
            timestamp,
            change_count,
            field_count,
            entries,
        }
    }

    /// Render one human-readable log line per change, in the style of
    /// `"FIFO: Applied x=y by z (conflict resolved)"`, for operator tooling
    pub fn render_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(change_id, disposition, reason)| {
                format!(
                    "FIFO: {} change {} on session {} step {} ({reason})",
                    disposition.label(),
                    change_id,
                    self.session_id,
                    self.step_number,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lines_one_per_entry() {
        let entry = AuditEntry::new(
            SessionId::new("s1"),
            StepNumber::new(2),
            Utc::now(),
            2,
            1,
            vec![
                (ChangeId::new(), Disposition::Applied, "fifo_wins".to_string()),
                (
                    ChangeId::new(),
                    Disposition::ShadowedByConflictLoss,
                    "fifo_wins: lost to earlier timestamp".to_string(),
                ),
            ],
        );
        let lines = entry.render_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Applied"));
        assert!(lines[1].contains("Shadowed"));
    }

    #[test]
    fn empty_flush_renders_no_lines() {
        let entry = AuditEntry::new(SessionId::new("s1"), StepNumber::new(1), Utc::now(), 0, 0, vec![]);
        assert!(entry.render_lines().is_empty());
    }
}
