//! The closed error enumeration for the FIFO field-level change manager

use crate::ids::ChangeId;
use thiserror::Error;

/// Result alias using [`Error`] as its error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the change-manager pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// A field path failed to parse
    #[error("invalid field path: {0}")]
    InvalidFieldPath(#[from] crate::field_path::PathError),

    /// A caller-supplied `change_id` already exists in the store
    ///
    /// Exactly one `FieldChange` record may ever exist per `change_id`;
    /// re-submitting the same id is rejected rather than silently
    /// overwriting.
    #[error("change {0} already exists")]
    DuplicateChangeId(ChangeId),

    /// The referenced conflict does not exist in the store
    #[error("conflict {0} not found")]
    ConflictNotFound(ChangeId),

    /// No open conflict exists for the given field path
    #[error("no open conflict on session {session_id} step {step_number} field {field_path}")]
    NoOpenConflict {
        /// The session that was queried
        session_id: String,
        /// The step that was queried
        step_number: u32,
        /// The field path that was queried
        field_path: String,
    },

    /// A conflict was already resolved and cannot be resolved again
    #[error("conflict for change {0} was already resolved")]
    AlreadyResolved(ChangeId),

    /// A manual-resolution conflict was supplied a value for a strategy that
    /// does not accept one, or vice versa
    #[error("resolution strategy {0:?} requires an explicit value")]
    ResolutionValueRequired(crate::conflict::ResolutionStrategy),

    /// A path segment resolved to a non-object value while the path still
    /// had segments beneath it
    #[error("field path {path:?} conflicts with existing non-object value at {at:?}")]
    PathConflict {
        /// The full field path being applied
        path: String,
        /// The segment at which traversal hit a non-object
        at: String,
    },

    /// The underlying store is temporarily unavailable (lock poisoned,
    /// backing store unreachable, etc.)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An invariant the system assumes was violated; should never surface in
    /// normal operation
    #[error("internal error: {0}")]
    Internal(String),
}
