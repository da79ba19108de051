//! The external `workflow_sessions` contract: atomic per-step document updates

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fcm_core::{Error, Result, SessionId, StepNumber};
use serde::{Deserialize, Serialize};

/// Who last wrote a step's `data` document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriterIdentity {
    /// The reducer's own flush wrote this step (`step.modified_by_fifo`)
    FifoBatch,
    /// Some other writer outside the change manager
    External(String),
}

/// A single workflow step's nested document plus its write stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDocument {
    /// The step's nested, arbitrarily-shaped data
    pub data: serde_json::Value,
    /// When this step's data was last written
    pub last_modified: DateTime<Utc>,
    /// Who wrote it last
    pub modified_by: WriterIdentity,
}

impl StepDocument {
    /// An empty step document, as it exists before any write
    pub fn empty() -> Self {
        Self {
            data: serde_json::Value::Object(serde_json::Map::new()),
            last_modified: DateTime::<Utc>::MIN_UTC,
            modified_by: WriterIdentity::External("unknown".to_string()),
        }
    }
}

/// Atomic single-document access to a session's steps
///
/// The core requires only that `write_step` be atomic per `(session, step)`;
/// it never attempts a cross-document transaction.
pub trait DocumentStore: Send + Sync {
    /// Read a step's current document, defaulting to an empty one if the
    /// session or step has never been written
    fn read_step(&self, session: &SessionId, step: StepNumber) -> Result<StepDocument>;

    /// Atomically replace a step's document
    fn write_step(&self, session: &SessionId, step: StepNumber, document: StepDocument) -> Result<()>;
}

/// A [`DocumentStore`] backed by `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    steps: DashMap<(SessionId, StepNumber), StepDocument>,
}

impl InMemoryDocumentStore {
    /// Construct an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn read_step(&self, session: &SessionId, step: StepNumber) -> Result<StepDocument> {
        Ok(self
            .steps
            .get(&(session.clone(), step))
            .map(|entry| entry.clone())
            .unwrap_or_else(StepDocument::empty))
    }

    fn write_step(&self, session: &SessionId, step: StepNumber, document: StepDocument) -> Result<()> {
        if !document.data.is_object() {
            return Err(Error::Internal(
                "step document root must be a JSON object".to_string(),
            ));
        }
        tracing::trace!(%session, step = step.as_u32(), "step document written");
        self.steps.insert((session.clone(), step), document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reading_unknown_step_yields_empty_document() {
        let store = InMemoryDocumentStore::new();
        let doc = store.read_step(&SessionId::new("s1"), StepNumber::new(1)).unwrap();
        assert_eq!(doc.data, json!({}));
    }

    #[test]
    fn write_then_read_round_trips() {
        let store = InMemoryDocumentStore::new();
        let doc = StepDocument {
            data: json!({"a": 1}),
            last_modified: Utc::now(),
            modified_by: WriterIdentity::FifoBatch,
        };
        store.write_step(&SessionId::new("s1"), StepNumber::new(1), doc.clone()).unwrap();
        let read_back = store.read_step(&SessionId::new("s1"), StepNumber::new(1)).unwrap();
        assert_eq!(read_back, doc);
    }

    #[test]
    fn rejects_non_object_root() {
        let store = InMemoryDocumentStore::new();
        let doc = StepDocument {
            data: json!([1, 2, 3]),
            last_modified: Utc::now(),
            modified_by: WriterIdentity::FifoBatch,
        };
        assert!(store.write_step(&SessionId::new("s1"), StepNumber::new(1), doc).is_err());
    }
}
