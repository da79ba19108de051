//! Append-only audit trail for flush batches
//!
//! Scaled down from a full write-ahead log (segment framing, checksums,
//! recovery replay) to the one guarantee this system actually needs: once an
//! [`fcm_core::AuditEntry`] is recorded it is never mutated, only read back
//! or pruned by retention age.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit_log;

pub use audit_log::{AuditLog, InMemoryAuditLog};
