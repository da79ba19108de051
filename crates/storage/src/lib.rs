//! In-memory, DashMap-sharded storage backends
//!
//! Each store is expressed as a trait plus a `DashMap`-backed default
//! implementation. Replacing a backend with a real document database means
//! implementing the trait; nothing above this crate depends on the
//! in-memory representation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change_store;
pub mod conflict_store;
pub mod document_store;

pub use change_store::{ChangeStore, InMemoryChangeStore};
pub use conflict_store::{ConflictStore, InMemoryConflictStore};
pub use document_store::{DocumentStore, InMemoryDocumentStore, StepDocument, WriterIdentity};
