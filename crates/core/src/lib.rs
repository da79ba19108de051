//! Core types and traits for the FIFO field-level change manager
//!
//! This crate defines the foundational, I/O-free types used throughout the
//! system:
//! - [`SessionId`], [`StepNumber`], [`ChangeId`]: locators and identifiers
//! - [`FieldPath`]: a dot-separated path into a nested document
//! - [`FieldValue`]: the typed variant a change's value is represented as
//! - [`FieldChange`] / [`FieldConflict`] / [`AuditEntry`]: the data model
//! - [`Error`]: the closed error enumeration for the whole system
//! - [`clock`]: monotonic timestamp allocation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod change;
pub mod clock;
pub mod conflict;
pub mod error;
pub mod field_path;
pub mod field_value;
pub mod ids;

pub use audit::{AuditEntry, Disposition};
pub use change::FieldChange;
pub use clock::{Clock, MonotonicClock};
pub use conflict::{FieldConflict, ResolutionStrategy};
pub use error::{Error, Result};
pub use field_path::{FieldPath, PathError};
pub use field_value::FieldValue;
pub use ids::{ChangeId, SessionId, StepNumber};
