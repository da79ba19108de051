//! Resolver (C5): decides the winner of a contested field, given a strategy

use fcm_core::{ChangeId, FieldChange, FieldValue, ResolutionStrategy};
use std::collections::BTreeSet;

/// The result of applying a [`ResolutionStrategy`] to a conflict's members
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverOutcome {
    /// A final value was decided
    Decided {
        /// The value to write to the field
        final_value: FieldValue,
        /// Member changes whose contribution was applied — exactly one for
        /// `fifo_wins`/`latest_wins` and the degraded `merge` path, all of
        /// them for a successful object `merge`
        applied: BTreeSet<ChangeId>,
    },
    /// `manual` strategy: no decision, the conflict stays open
    Deferred,
}

/// Pure decision function over a conflict's member changes
///
/// `members` must already be FIFO ordered (ascending `timestamp`, ties
/// ascending `change_id`) — exactly what [`fcm_storage::ChangeStore::pending_for_field`]
/// returns.
pub fn resolve(strategy: ResolutionStrategy, members: &[FieldChange]) -> ResolverOutcome {
    assert!(!members.is_empty(), "resolver requires at least one member");

    match strategy {
        ResolutionStrategy::FifoWins => decide_single(&members[0]),
        ResolutionStrategy::LatestWins => decide_single(members.last().unwrap()),
        ResolutionStrategy::Merge => {
            if members.iter().all(|c| c.new_value.is_object()) {
                let mut merged = members[0].new_value.clone();
                for change in &members[1..] {
                    merged = merged.merge_over(&change.new_value);
                }
                ResolverOutcome::Decided {
                    final_value: merged,
                    applied: members.iter().map(|c| c.change_id).collect(),
                }
            } else {
                decide_single(members.last().unwrap())
            }
        }
        ResolutionStrategy::Manual => ResolverOutcome::Deferred,
    }
}

fn decide_single(winner: &FieldChange) -> ResolverOutcome {
    ResolverOutcome::Decided {
        final_value: winner.new_value.clone(),
        applied: BTreeSet::from([winner.change_id]),
    }
}
