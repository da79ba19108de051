//! DocumentApplier (C7): safe dot-path merge into a step's nested document

use chrono::{DateTime, Utc};
use fcm_core::{Error, FieldPath, FieldValue, Result, SessionId, StepNumber};
use fcm_storage::{DocumentStore, StepDocument, WriterIdentity};
use std::collections::BTreeMap;

/// Merge a field→value map into a step's document and commit it atomically
///
/// Sibling keys not named in `values` are left untouched. If any path
/// traverses through an existing non-object value, the whole batch is
/// rejected with [`Error::PathConflict`] and nothing is written — callers
/// must not observe a partially-applied batch.
pub fn apply(
    store: &dyn DocumentStore,
    session: &SessionId,
    step: StepNumber,
    values: &BTreeMap<FieldPath, FieldValue>,
    now: DateTime<Utc>,
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }

    let mut document = store.read_step(session, step)?;
    for (path, value) in values {
        set_at_path(&mut document.data, path, value.as_json().clone())?;
    }
    document.last_modified = now;
    document.modified_by = WriterIdentity::FifoBatch;

    tracing::info!(
        %session,
        step = step.as_u32(),
        fields = values.len(),
        "document updated by fifo batch"
    );

    store.write_step(session, step, document)
}

fn set_at_path(root: &mut serde_json::Value, path: &FieldPath, value: serde_json::Value) -> Result<()> {
    let segments: Vec<&str> = path.segments().collect();
    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;
        let object = current.as_object_mut().ok_or_else(|| Error::PathConflict {
            path: path.as_str().to_string(),
            at: segments[..i].join("."),
        })?;
        if is_last {
            object.insert((*segment).to_string(), value);
            return Ok(());
        }
        current = object
            .entry((*segment).to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    }
    Ok(())
}
