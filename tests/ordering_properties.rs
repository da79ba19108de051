//! Property-based checks for FIFO ordering and flush idempotence

use fcm_concurrency::{ChangeManager, ChangeManagerConfig, EnqueueRequest};
use fcm_core::{FieldValue, MonotonicClock, ResolutionStrategy, SessionId, StepNumber};
use fcm_durability::InMemoryAuditLog;
use fcm_storage::{DocumentStore, InMemoryChangeStore, InMemoryConflictStore, InMemoryDocumentStore};
use proptest::prelude::*;
use std::sync::Arc;

fn build_manager() -> (ChangeManager, Arc<InMemoryDocumentStore>) {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let manager = ChangeManager::new(
        Arc::new(MonotonicClock::new()),
        Arc::new(InMemoryChangeStore::new()),
        Arc::new(InMemoryConflictStore::new()),
        documents.clone(),
        Arc::new(InMemoryAuditLog::new()),
        ChangeManagerConfig {
            default_strategy: ResolutionStrategy::LatestWins,
            retention_days: 30,
        },
    );
    (manager, documents)
}

proptest! {
    /// Writing the same disjoint field paths in any order, each exactly once,
    /// always settles on the same final document.
    #[test]
    fn disjoint_field_writes_are_order_independent(
        values in prop::collection::vec(any::<i64>(), 3..8),
        seed in 0u64..10_000,
    ) {
        let (manager, documents) = build_manager();
        let session = SessionId::new("order-prop");
        let step = StepNumber::new(1);

        let mut order: Vec<usize> = (0..values.len()).collect();
        // deterministic shuffle from the proptest-supplied seed, no RNG crate needed
        for i in (1..order.len()).rev() {
            let j = (seed as usize + i * 2654435761) % (i + 1);
            order.swap(i, j);
        }

        for idx in &order {
            manager
                .enqueue(EnqueueRequest {
                    session_id: session.clone(),
                    step_number: step,
                    field_path: format!("f{idx}"),
                    old_value: None,
                    new_value: FieldValue::from(values[*idx]),
                    user_id: "u".to_string(),
                    user_name: "u".to_string(),
                    change_id: None,
                    resolution_strategy: None,
                })
                .unwrap();
        }

        manager.flush(&session, step).unwrap();
        let doc = documents.read_step(&session, step).unwrap();

        for (idx, value) in values.iter().enumerate() {
            prop_assert_eq!(doc.data.get(format!("f{idx}")).unwrap(), &serde_json::json!(value));
        }
    }

    /// Flushing a step with no newly-enqueued changes since the last flush is
    /// always a no-op: no document mutation, no newly-applied changes.
    #[test]
    fn reflushing_without_new_changes_is_idempotent(values in prop::collection::vec(any::<i64>(), 1..5)) {
        let (manager, documents) = build_manager();
        let session = SessionId::new("idem-prop");
        let step = StepNumber::new(1);

        for (idx, value) in values.iter().enumerate() {
            manager
                .enqueue(EnqueueRequest {
                    session_id: session.clone(),
                    step_number: step,
                    field_path: format!("f{idx}"),
                    old_value: None,
                    new_value: FieldValue::from(*value),
                    user_id: "u".to_string(),
                    user_name: "u".to_string(),
                    change_id: None,
                    resolution_strategy: None,
                })
                .unwrap();
        }

        manager.flush(&session, step).unwrap();
        let first_doc = documents.read_step(&session, step).unwrap().data;

        let second = manager.flush(&session, step).unwrap();
        let second_doc = documents.read_step(&session, step).unwrap().data;

        prop_assert_eq!(second.changes_applied, 0);
        prop_assert!(second.final_values.is_none());
        prop_assert_eq!(first_doc, second_doc);
    }
}
